/// Watermark of the next update id to request.
///
/// Unset until the first update is seen; afterwards it only moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateCursor {
    next: Option<i64>,
}

impl UpdateCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset for the next poll; `None` until an update has been handled.
    pub fn offset(&self) -> Option<i64> {
        self.next
    }

    /// Whether `update_id` has not been handled yet in this run.
    pub fn accepts(&self, update_id: i64) -> bool {
        self.next.is_none_or(|next| update_id >= next)
    }

    /// Move the watermark past `update_id`. Never moves backwards.
    pub fn advance_past(&mut self, update_id: i64) {
        let candidate = update_id.saturating_add(1);
        self.next = Some(self.next.map_or(candidate, |next| next.max(candidate)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cursor_accepts_everything() {
        let cursor = UpdateCursor::new();
        assert_eq!(cursor.offset(), None);
        assert!(cursor.accepts(0));
        assert!(cursor.accepts(-5));
    }

    #[test]
    fn test_advance_is_monotonic() {
        let mut cursor = UpdateCursor::new();
        cursor.advance_past(10);
        assert_eq!(cursor.offset(), Some(11));
        assert!(!cursor.accepts(10));
        assert!(cursor.accepts(11));

        cursor.advance_past(3);
        assert_eq!(cursor.offset(), Some(11));
    }
}
