use std::{collections::VecDeque, sync::Arc};

use tokio::sync::broadcast;

/// Lines kept for `/api/logs` clients that connect late.
pub(crate) const RING_CAPACITY: usize = 500;

/// Mirrors every event as a JSON line to the SSE log stream.
pub(crate) struct BroadcastLayer {
    pub tx: broadcast::Sender<String>,
    pub ring: Arc<std::sync::Mutex<VecDeque<String>>>,
}

struct MessageVisitor<'a> {
    message: &'a mut String,
}

impl tracing::field::Visit for MessageVisitor<'_> {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            *self.message = value.to_string();
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message.clear();
            use std::fmt::Write;
            let _ = write!(self.message, "{value:?}");
            if self.message.starts_with('"') && self.message.ends_with('"') && self.message.len() > 1 {
                *self.message = self.message[1..self.message.len() - 1].to_string();
            }
        }
    }
}

/// Group events by the module that emitted them.
pub(crate) fn category_for(target: &str) -> &'static str {
    if target.contains("gemini") || target.contains("analyst") || target.contains("retry") {
        "llm"
    } else if target.contains("ledger") || target.contains("tenancy") {
        "ledger"
    } else if target.contains("solana") || target.contains("evidence") {
        "chain"
    } else {
        "system"
    }
}

pub(crate) fn push_line(ring: &std::sync::Mutex<VecDeque<String>>, line: String) {
    if let Ok(mut ring) = ring.lock() {
        ring.push_back(line);
        while ring.len() > RING_CAPACITY {
            ring.pop_front();
        }
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for BroadcastLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let level = match *event.metadata().level() {
            tracing::Level::ERROR => "err",
            tracing::Level::WARN => "warn",
            tracing::Level::INFO => "info",
            tracing::Level::DEBUG => "debug",
            tracing::Level::TRACE => return,
        };

        let mut message = String::new();
        event.record(&mut MessageVisitor {
            message: &mut message,
        });

        let json = serde_json::json!({
            "ts": chrono::Utc::now().timestamp(),
            "level": level,
            "message": message,
            "category": category_for(event.metadata().target()),
        })
        .to_string();

        let _ = self.tx.send(json.clone());
        push_line(&self.ring, json);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_module_path() {
        assert_eq!(category_for("defender_agent::gemini"), "llm");
        assert_eq!(category_for("defender_core::retry"), "llm");
        assert_eq!(category_for("defender_core::ledger"), "ledger");
        assert_eq!(category_for("defender_core::solana"), "chain");
        assert_eq!(category_for("tower_http::trace::on_response"), "system");
    }

    #[test]
    fn ring_is_bounded() {
        let ring = std::sync::Mutex::new(VecDeque::new());
        for i in 0..RING_CAPACITY + 10 {
            push_line(&ring, i.to_string());
        }
        let ring = ring.lock().unwrap();
        assert_eq!(ring.len(), RING_CAPACITY);
        assert_eq!(ring.front().map(String::as_str), Some("10"));
    }
}
