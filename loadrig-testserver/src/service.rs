//! In-memory auth and messaging service.

use std::collections::HashMap;

use loadrig_rpc::RpcReply;
use loadrig_rpc::status;
use serde::Deserialize;
use serde_json::json;

pub const OP_REGISTER: &str = "Register";
pub const OP_LOGIN: &str = "Login";
pub const OP_SEND_MESSAGE: &str = "SendMessage";
pub const OP_GET_MESSAGES: &str = "GetMessages";

const DEFAULT_MESSAGE_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Register,
    Login,
    SendMessage,
    GetMessages,
}

impl Operation {
    pub(crate) fn parse(name: &str) -> Option<Self> {
        match name {
            OP_REGISTER => Some(Self::Register),
            OP_LOGIN => Some(Self::Login),
            OP_SEND_MESSAGE => Some(Self::SendMessage),
            OP_GET_MESSAGES => Some(Self::GetMessages),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Credentials {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    device_name: String,
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    #[serde(default)]
    recipient_user_id: String,
    #[serde(default)]
    encrypted_content: String,
    #[serde(default)]
    content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetMessagesRequest {
    #[serde(default)]
    other_user_id: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug)]
struct User {
    user_id: String,
    password: String,
    device_id: String,
}

#[derive(Debug)]
struct StoredMessage {
    message_id: String,
    sender_user_id: String,
    recipient_user_id: String,
    encrypted_content: String,
    content_type: String,
    timestamp: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Store {
    users: HashMap<String, User>,
    // access token -> user_id
    tokens: HashMap<String, String>,
    known_user_ids: HashMap<String, String>,
    messages: Vec<StoredMessage>,
    next_id: u64,
}

impl Store {
    pub(crate) fn users_total(&self) -> usize {
        self.users.len()
    }

    pub(crate) fn messages_total(&self) -> usize {
        self.messages.len()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn issue_tokens(&mut self, user_id: &str) -> (String, String) {
        let n = self.next_id();
        let access = format!("at-{n}-{user_id}");
        let refresh = format!("rt-{n}-{user_id}");
        self.tokens.insert(access.clone(), user_id.to_string());
        (access, refresh)
    }

    pub(crate) fn handle(
        &mut self,
        op: Operation,
        bearer: Option<&str>,
        payload: serde_json::Value,
    ) -> RpcReply {
        match op {
            Operation::Register => match serde_json::from_value(payload) {
                Ok(req) => self.register(req),
                Err(e) => RpcReply::error(status::INVALID_ARGUMENT, &e.to_string()),
            },
            Operation::Login => match serde_json::from_value(payload) {
                Ok(req) => self.login(req),
                Err(e) => RpcReply::error(status::INVALID_ARGUMENT, &e.to_string()),
            },
            Operation::SendMessage => {
                let Some(sender) = self.authenticate(bearer) else {
                    return RpcReply::error(status::UNAUTHENTICATED, "missing or invalid token");
                };
                match serde_json::from_value(payload) {
                    Ok(req) => self.send_message(sender, req),
                    Err(e) => RpcReply::error(status::INVALID_ARGUMENT, &e.to_string()),
                }
            }
            Operation::GetMessages => {
                let Some(caller) = self.authenticate(bearer) else {
                    return RpcReply::error(status::UNAUTHENTICATED, "missing or invalid token");
                };
                match serde_json::from_value(payload) {
                    Ok(req) => self.get_messages(&caller, req),
                    Err(e) => RpcReply::error(status::INVALID_ARGUMENT, &e.to_string()),
                }
            }
        }
    }

    fn authenticate(&self, bearer: Option<&str>) -> Option<String> {
        bearer.and_then(|token| self.tokens.get(token)).cloned()
    }

    fn register(&mut self, req: Credentials) -> RpcReply {
        if req.username.is_empty() || req.password.is_empty() {
            return RpcReply::error(status::INVALID_ARGUMENT, "username and password required");
        }
        if self.users.contains_key(&req.username) {
            return RpcReply::error(status::ALREADY_EXISTS, "username already taken");
        }

        let n = self.next_id();
        let user_id = format!("user-{n}");
        let device_id = format!("device-{n}");
        self.known_user_ids
            .insert(user_id.clone(), req.username.clone());
        self.users.insert(
            req.username,
            User {
                user_id: user_id.clone(),
                password: req.password,
                device_id: device_id.clone(),
            },
        );

        let (access_token, refresh_token) = self.issue_tokens(&user_id);
        RpcReply::ok(json!({
            "user_id": user_id,
            "device_id": device_id,
            "device_name": req.device_name,
            "access_token": access_token,
            "refresh_token": refresh_token,
        }))
    }

    fn login(&mut self, req: Credentials) -> RpcReply {
        let (user_id, device_id) = match self.users.get(&req.username) {
            None => return RpcReply::error(status::NOT_FOUND, "unknown user"),
            Some(u) if u.password != req.password => {
                return RpcReply::error(status::UNAUTHENTICATED, "wrong password");
            }
            Some(u) => (u.user_id.clone(), u.device_id.clone()),
        };

        let (access_token, refresh_token) = self.issue_tokens(&user_id);
        RpcReply::ok(json!({
            "user_id": user_id,
            "device_id": device_id,
            "access_token": access_token,
            "refresh_token": refresh_token,
        }))
    }

    fn send_message(&mut self, sender: String, req: SendMessageRequest) -> RpcReply {
        if !self.known_user_ids.contains_key(&req.recipient_user_id) {
            return RpcReply::error(status::NOT_FOUND, "unknown recipient");
        }

        let n = self.next_id();
        let message_id = format!("msg-{n}");
        self.messages.push(StoredMessage {
            message_id: message_id.clone(),
            sender_user_id: sender,
            recipient_user_id: req.recipient_user_id,
            encrypted_content: req.encrypted_content,
            content_type: req.content_type.unwrap_or_else(|| "text/plain".to_string()),
            timestamp: n,
        });

        RpcReply::ok(json!({ "message_id": message_id, "timestamp": n }))
    }

    fn get_messages(&self, caller: &str, req: GetMessagesRequest) -> RpcReply {
        let limit = req.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT);
        let other = req.other_user_id.as_str();

        let mut conversation: Vec<&StoredMessage> = self
            .messages
            .iter()
            .rev()
            .filter(|m| {
                (m.sender_user_id == caller && m.recipient_user_id == other)
                    || (m.sender_user_id == other && m.recipient_user_id == caller)
            })
            .take(limit)
            .collect();
        conversation.reverse();

        let messages: Vec<serde_json::Value> = conversation
            .into_iter()
            .map(|m| {
                json!({
                    "message_id": m.message_id,
                    "sender_user_id": m.sender_user_id,
                    "recipient_user_id": m.recipient_user_id,
                    "encrypted_content": m.encrypted_content,
                    "content_type": m.content_type,
                    "timestamp": m.timestamp,
                })
            })
            .collect();

        RpcReply::ok(json!({ "messages": messages }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(store: &mut Store, username: &str) -> serde_json::Value {
        let reply = store.handle(
            Operation::Register,
            None,
            json!({ "username": username, "password": "pw", "device_name": "dev" }),
        );
        assert!(reply.is_ok(), "register failed: {reply:?}");
        reply.message
    }

    #[test]
    fn register_then_login_returns_same_user() {
        let mut store = Store::default();
        let reg = register(&mut store, "alice");

        let login = store.handle(
            Operation::Login,
            None,
            json!({ "username": "alice", "password": "pw" }),
        );
        assert!(login.is_ok());
        assert_eq!(login.message["user_id"], reg["user_id"]);
        assert_eq!(store.users_total(), 1);
    }

    #[test]
    fn duplicate_and_bad_credentials_are_rejected() {
        let mut store = Store::default();
        register(&mut store, "alice");

        let dup = store.handle(
            Operation::Register,
            None,
            json!({ "username": "alice", "password": "pw" }),
        );
        assert_eq!(dup.status, status::ALREADY_EXISTS);

        let wrong = store.handle(
            Operation::Login,
            None,
            json!({ "username": "alice", "password": "nope" }),
        );
        assert_eq!(wrong.status, status::UNAUTHENTICATED);
    }

    #[test]
    fn messages_require_a_token_and_are_listed() {
        let mut store = Store::default();
        let sender = register(&mut store, "sender");
        let receiver = register(&mut store, "receiver");
        let token = sender["access_token"].as_str().map(str::to_string);

        let denied = store.handle(
            Operation::SendMessage,
            None,
            json!({ "recipient_user_id": receiver["user_id"] }),
        );
        assert_eq!(denied.status, status::UNAUTHENTICATED);

        let sent = store.handle(
            Operation::SendMessage,
            token.as_deref(),
            json!({ "recipient_user_id": receiver["user_id"], "encrypted_content": "hi" }),
        );
        assert!(sent.is_ok());

        let listed = store.handle(
            Operation::GetMessages,
            token.as_deref(),
            json!({ "other_user_id": receiver["user_id"], "limit": 10 }),
        );
        assert!(listed.is_ok());
        assert_eq!(
            listed.message["messages"][0]["message_id"],
            sent.message["message_id"]
        );
        assert_eq!(store.messages_total(), 1);
    }
}
