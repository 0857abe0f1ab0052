//! Polling context handed to every callback.

use indexmap::IndexMap;

use crate::response::PollResponse;

/// History of one operation as seen by its poller.
///
/// Callbacks receive an owned snapshot; only the engine records responses,
/// right after each activation or poll call and before the next callback
/// runs. Caller-supplied `data` entries are fixed when the poller is built.
#[derive(Debug, Clone)]
pub struct PollingContext<T> {
    activation: Option<PollResponse<T>>,
    latest: Option<PollResponse<T>>,
    history: Vec<PollResponse<T>>,
    data: IndexMap<String, String>,
}

impl<T> Default for PollingContext<T> {
    fn default() -> Self {
        Self {
            activation: None,
            latest: None,
            history: Vec::new(),
            data: IndexMap::new(),
        }
    }
}

impl<T> PollingContext<T> {
    pub(crate) fn with_data(data: IndexMap<String, String>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// Response returned by the activation callback, once activated.
    pub fn activation_response(&self) -> Option<&PollResponse<T>> {
        self.activation.as_ref()
    }

    /// Most recent response: the activation response until the first poll
    /// completes, then the latest poll response.
    pub fn latest_response(&self) -> Option<&PollResponse<T>> {
        self.latest.as_ref()
    }

    /// Every recorded response in observation order, activation first.
    pub fn history(&self) -> &[PollResponse<T>] {
        &self.history
    }

    /// Number of poll responses recorded after activation.
    pub fn poll_count(&self) -> usize {
        self.history.len().saturating_sub(1)
    }

    /// Whether the activation response has been recorded.
    pub fn is_activated(&self) -> bool {
        self.activation.is_some()
    }

    /// Look up a caller-supplied entry.
    pub fn data(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Caller-supplied entries in insertion order.
    pub fn data_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<T: Clone> PollingContext<T> {
    pub(crate) fn record_activation(&mut self, response: PollResponse<T>) {
        self.activation = Some(response.clone());
        self.latest = Some(response.clone());
        self.history.push(response);
    }

    pub(crate) fn record_poll(&mut self, response: PollResponse<T>) {
        self.latest = Some(response.clone());
        self.history.push(response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::OperationStatus;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_context_has_no_responses() {
        let ctx = PollingContext::<String>::default();
        assert!(ctx.activation_response().is_none());
        assert!(ctx.latest_response().is_none());
        assert_eq!(ctx.poll_count(), 0);
        assert!(!ctx.is_activated());
    }

    #[test]
    fn activation_sets_both_reserved_slots() {
        let mut ctx = PollingContext::default();
        let activation = PollResponse::new(OperationStatus::NOT_STARTED, "a".to_string());
        ctx.record_activation(activation.clone());

        assert_eq!(ctx.activation_response(), Some(&activation));
        assert_eq!(ctx.latest_response(), Some(&activation));
        assert_eq!(ctx.poll_count(), 0);
    }

    #[test]
    fn polls_move_latest_and_keep_activation() {
        let mut ctx = PollingContext::default();
        let activation = PollResponse::new(OperationStatus::NOT_STARTED, 0);
        ctx.record_activation(activation.clone());
        ctx.record_poll(PollResponse::new(OperationStatus::IN_PROGRESS, 1));
        ctx.record_poll(PollResponse::new(OperationStatus::SUCCESSFULLY_COMPLETED, 2));

        assert_eq!(ctx.activation_response(), Some(&activation));
        assert_eq!(ctx.latest_response().and_then(PollResponse::value), Some(&2));
        assert_eq!(ctx.poll_count(), 2);
        let values: Vec<_> = ctx.history().iter().filter_map(PollResponse::value).collect();
        assert_eq!(values, vec![&0, &1, &2]);
    }

    #[test]
    fn data_keeps_insertion_order() {
        let mut data = IndexMap::new();
        data.insert("zeta".to_string(), "1".to_string());
        data.insert("alpha".to_string(), "2".to_string());
        let ctx = PollingContext::<()>::with_data(data);

        assert_eq!(ctx.data("alpha"), Some("2"));
        let keys: Vec<_> = ctx.data_entries().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }
}
