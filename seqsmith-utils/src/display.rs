//! Text layout helpers shared by the CLI binaries.

/// Lay out items in `columns` tab-separated columns, one row per line.
/// A column count of 0 is treated as 1.
pub fn columnize(items: &[String], columns: usize) -> String {
    let columns = columns.max(1);
    let mut output = String::new();
    for (i, item) in items.iter().enumerate() {
        output.push_str(item);
        if (i + 1) % columns == 0 {
            output = output.trim_end().to_string();
            output.push('\n');
        } else {
            output.push('\t');
        }
    }
    output.trim_end().to_string()
}

/// Banner block used for stderr reports (deleted records, hash tables, ...)
pub fn banner(body: &str) -> String {
    let rule = "# ################################################################ #";
    format!("{}\n{}\n{}", rule, body.trim_end(), rule)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columnize_single_column() {
        let items = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(columnize(&items, 1), "a\nb\nc");
    }

    #[test]
    fn test_columnize_two_columns() {
        let items = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(columnize(&items, 2), "a\tb\nc");
    }

    #[test]
    fn test_columnize_zero_treated_as_one() {
        let items = vec!["x".to_string()];
        assert_eq!(columnize(&items, 0), "x");
    }

    #[test]
    fn test_banner_wraps_body() {
        let b = banner("hello");
        assert!(b.starts_with("# ####"));
        assert!(b.contains("\nhello\n"));
        assert!(b.ends_with("# #"));
    }
}
