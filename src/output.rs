use crate::model::FeedDocument;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// The feed document as pretty-printed JSON
    #[default]
    Json,
    /// A short markdown summary for reading in a terminal
    Text,
}

pub fn render_feed(feed: &FeedDocument, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(feed).map(|mut json| {
            json.push('\n');
            json
        }),
        OutputFormat::Text => Ok(format_feed_summary(feed)),
    }
}

pub fn format_feed_summary(feed: &FeedDocument) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "## {} ({} {})\n\n",
        feed.title,
        format_number(feed.items.len()),
        if feed.items.len() == 1 { "item" } else { "items" }
    ));

    if feed.items.is_empty() {
        out.push_str("No matching products.\n");
    }

    for (i, item) in feed.items.iter().enumerate() {
        out.push_str(&format!("### {}. {}\n", i + 1, item.title));
        out.push_str(&format!("- **URL:** {}\n", item.url));
        if let Some(ref image) = item.image {
            out.push_str(&format!("- **Image:** {}\n", image));
        }
        out.push_str(&format!("- **Published:** {}\n", item.date_published));

        if i < feed.items.len() - 1 {
            out.push_str("\n---\n\n");
        }
    }

    out.push_str(&format!("\nSource: {}\n", feed.home_page_url));
    out
}

fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}
