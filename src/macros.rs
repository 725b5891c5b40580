//! Convenience macros.

/// Build a [`Record`](crate::Record) from `column => value` pairs, preserving
/// declaration order.
///
/// # Examples
///
/// ```
/// use sluice::record;
///
/// let entry = record! { "name" => "Test", "abv" => 4.9f64 };
/// assert_eq!(entry.columns().collect::<Vec<_>>(), vec!["name", "abv"]);
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($column:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $(
            record.set($column, $value);
        )+
        record
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_record_macro_orders_pairs() {
        let record = record! { "b" => 1i32, "a" => 2i32 };
        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn test_empty_record_macro() {
        let record = record! {};
        assert!(record.is_empty());
    }
}
