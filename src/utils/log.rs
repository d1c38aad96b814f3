// src/utils/log.rs

//! Banner and summary helpers on top of the `log` facade.

/// Width of banner separators.
const RULE_WIDTH: usize = 60;

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(RULE_WIDTH);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for line in summary_lines(items) {
        log::info!("{}", line);
    }
}

fn summary_lines(items: &[(&str, String)]) -> Vec<String> {
    let width = items.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    items
        .iter()
        .map(|(key, value)| format!("    {:<width$} : {}", key, value, width = width))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lines_align_keys() {
        let lines = summary_lines(&[("pages", "3".to_string()), ("transitions", "1".to_string())]);
        assert_eq!(lines[0], "    pages       : 3");
        assert_eq!(lines[1], "    transitions : 1");
    }

    #[test]
    fn test_summary_lines_empty() {
        assert!(summary_lines(&[]).is_empty());
    }
}
