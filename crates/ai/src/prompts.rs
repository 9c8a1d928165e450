//! Prompt templates and parsing of completion output.

/// Prompt asking for three short campaign messages for `objective`.
pub fn suggest_message_prompt(objective: &str) -> String {
    format!(
        "You are a skilled marketing copywriter specializing in CRM campaigns.\n\
         Write 3 short, catchy, customer-friendly marketing messages tailored for the campaign \
         objective: \"{objective}\".\n\
         \n\
         Each message must:\n\
         - Be under 100 words.\n\
         - Sound natural, engaging, and persuasive (not robotic).\n\
         - Use a positive, friendly, and action-oriented tone.\n\
         - Vary the style: one urgent, one warm & personal, one value-driven.\n\
         - Avoid jargon, technical words, or sounding too salesy.\n\
         - Include numbers like discounts, or timeframes where relevant.\n\
         \n\
         Return the results as a numbered list, with each message on a separate line."
    )
}

/// Prompt asking for a two-to-three sentence summary of campaign stats.
pub fn summarize_performance_prompt(stats: &serde_json::Value) -> String {
    format!(
        "You are a CRM analytics assistant.\n\
         Summarize this campaign's performance in 2-3 sentences.\n\
         Stats: {stats}\n\
         Example style:\n\
         \"Your last campaign reached 1,284 users. 1,140 messages were delivered. \
         Customers with > 10K spend had the best delivery rate.\""
    )
}

/// Split a numbered list ("1. foo", "2) bar") into its items. Lines that are
/// not list items are attached to the previous item.
pub fn parse_numbered_list(text: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match strip_list_marker(line) {
            Some(item) => items.push(item.to_string()),
            None => match items.last_mut() {
                Some(last) => {
                    last.push(' ');
                    last.push_str(line);
                }
                None => items.push(line.to_string()),
            },
        }
    }
    items
}

fn strip_list_marker(line: &str) -> Option<&str> {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    let rest = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')'))?;
    Some(rest.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggest_prompt_mentions_objective() {
        let prompt = suggest_message_prompt("win back inactive shoppers");
        assert!(prompt.contains("\"win back inactive shoppers\""));
        assert!(prompt.contains("numbered list"));
    }

    #[test]
    fn test_summary_prompt_embeds_stats() {
        let stats = serde_json::json!({"sent": 9, "failed": 1});
        let prompt = summarize_performance_prompt(&stats);
        assert!(prompt.contains("\"sent\":9"));
    }

    #[test]
    fn test_parse_numbered_list() {
        let text = "1. Last chance: 30% off ends tonight!\n\
                    2) We saved your favourites,\n   come take a look.\n\
                    \n\
                    3. Members get free delivery this week.";
        let items = parse_numbered_list(text);
        assert_eq!(
            items,
            vec![
                "Last chance: 30% off ends tonight!".to_string(),
                "We saved your favourites, come take a look.".to_string(),
                "Members get free delivery this week.".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_unnumbered_text() {
        assert_eq!(parse_numbered_list("just one line"), vec!["just one line".to_string()]);
        assert!(parse_numbered_list("").is_empty());
    }
}
