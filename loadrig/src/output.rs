use crate::cli::OutputFormat;

mod human;
mod json;

pub(crate) use json::summary_document;

pub(crate) struct RunHeader<'a> {
    pub workflow: &'a loadrig_core::Workflow,
    pub config: &'a loadrig_core::RunConfig,
    pub target: &'a str,
}

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, header: &RunHeader<'_>);
    fn progress(&self) -> Option<loadrig_core::ProgressFn>;
    fn print_summary(&self, report: &loadrig_core::RunReport) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat, workflow: &str) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new(workflow)),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
