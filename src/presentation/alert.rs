// Single-slot alert shown to the operator
pub type AlertHandler = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub body: String,
}

#[derive(Default)]
pub struct AlertDialog {
    current: Option<Alert>,
    on_closed: Option<AlertHandler>,
}

impl AlertDialog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows an alert in place of the visible one.
    ///
    /// A new handler replaces the pending one. Without a handler, a pending one is kept
    /// so an earlier fatal alert still tears the session down when acknowledged.
    pub fn show(&mut self, title: &str, body: &str, on_closed: Option<AlertHandler>) {
        if self.current.is_some() {
            tracing::debug!("Replacing visible alert with \"{}\"", title);
        }
        self.current = Some(Alert {
            title: title.to_string(),
            body: body.to_string(),
        });
        if let Some(handler) = on_closed {
            self.on_closed = Some(handler);
        }
    }

    /// Hides the alert and fires its handler at most once. Returns false when nothing was shown.
    pub fn acknowledge(&mut self) -> bool {
        if self.current.take().is_none() {
            return false;
        }
        if let Some(handler) = self.on_closed.take() {
            handler();
        }
        true
    }

    pub fn current(&self) -> Option<&Alert> {
        self.current.as_ref()
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    #[cfg(test)]
    pub fn has_pending_handler(&self) -> bool {
        self.on_closed.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(counter: &Arc<AtomicUsize>) -> Option<AlertHandler> {
        let counter = counter.clone();
        Some(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn test_last_alert_wins() {
        let mut dialog = AlertDialog::new();
        dialog.show("First", "one", None);
        dialog.show("Second", "two", None);

        assert_eq!(dialog.current().map(|a| a.title.as_str()), Some("Second"));
        assert!(dialog.acknowledge());
        assert!(!dialog.is_open());
        assert!(!dialog.acknowledge());
    }

    #[test]
    fn test_handler_fires_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut dialog = AlertDialog::new();

        dialog.show("Connection closed", "bye", counting(&fired));
        assert!(dialog.acknowledge());
        dialog.show("Communication error", "later", None);
        assert!(dialog.acknowledge());

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!dialog.has_pending_handler());
    }

    #[test]
    fn test_new_handler_replaces_pending_one() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut dialog = AlertDialog::new();

        dialog.show("Connection error", "a", counting(&first));
        dialog.show("Connection closed", "b", counting(&second));
        dialog.acknowledge();

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_plain_alert_keeps_pending_handler() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut dialog = AlertDialog::new();

        dialog.show("Connection closed", "bye", counting(&fired));
        dialog.show("Prediction unavailable", "try later", None);

        assert_eq!(
            dialog.current().map(|a| a.title.as_str()),
            Some("Prediction unavailable")
        );
        dialog.acknowledge();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
