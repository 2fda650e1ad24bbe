//! Turning stdin lines into customer messages
//!
//! A line is either plain text or a JSON `CustomerMessage` object. JSON
//! objects may leave out `context_id`/`customer_id`; the defaults given on
//! the command line fill them in.

use serde_json::{Map, Value};
use tracing::warn;

use triage::CustomerMessage;

/// Parse one input line. Blank lines yield `None`.
pub fn parse_line(line: &str, session: &str, customer: &str) -> Option<CustomerMessage> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if line.starts_with('{') {
        match serde_json::from_str::<Map<String, Value>>(line) {
            Ok(object) => match message_from_object(object, session, customer) {
                Ok(message) => return Some(message),
                Err(e) => warn!("Ignoring malformed message fields, treating line as text: {}", e),
            },
            Err(e) => warn!("Line is not valid JSON, treating it as text: {}", e),
        }
    }

    Some(CustomerMessage::new(session, customer, line))
}

fn message_from_object(
    mut object: Map<String, Value>,
    session: &str,
    customer: &str,
) -> serde_json::Result<CustomerMessage> {
    if !object.contains_key("context_id") && !object.contains_key("session_id") {
        object.insert("context_id".to_string(), Value::String(session.to_string()));
    }
    if !object.contains_key("customer_id") {
        object.insert("customer_id".to_string(), Value::String(customer.to_string()));
    }
    serde_json::from_value(Value::Object(object))
}
