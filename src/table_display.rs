use candygram::collections_cache::{CollectionsSnapshot, CollectionsStatus};
use candygram::connection::{describe_uri, Connection};
use candygram::executor::DocumentMatch;
use candygram::state::{ModeView, OutputView, Tone};
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use crossterm::style::Stylize;
use serde_json::Value;

/// Documents at or below this count are printed in full
const FULL_DOCUMENT_LIMIT: usize = 3;

pub fn print_message(message: &str, tone: Tone) {
    let styled = match tone {
        Tone::Info => message.cyan(),
        Tone::Success => message.green(),
        Tone::Warning => message.yellow(),
        Tone::Error => message.red(),
    };
    println!("{}", styled);
}

pub fn display_view(view: &ModeView) {
    print_message(&view.message, view.tone);
    match &view.output {
        OutputView::Hidden => {}
        OutputView::Loading(text) => println!("{}", text.as_str().dark_grey()),
        OutputView::Matches(matches) => display_matches(matches),
        OutputView::Results(results) => display_documents(results),
        OutputView::TooLarge {
            guidance,
            approx_size_bytes,
            max_size_bytes,
            matches_metadata,
        } => {
            println!("{}", guidance.as_str().yellow());
            println!("  approxSizeBytes: {}", approx_size_bytes);
            println!("  maxSizeBytes:    {}", max_size_bytes);
            if let Some(metadata) = matches_metadata {
                println!("  matchesMetadata: {}", metadata);
            }
        }
    }
}

pub fn display_matches(matches: &[DocumentMatch]) {
    for m in matches {
        println!("{}", format!("── {}", m.collection).bold());
        println!("{}", pretty(&m.document));
    }
}

/// Few documents are printed as JSON, more as a table of top-level fields
pub fn display_documents(data: &[Value]) {
    if data.is_empty() {
        println!("{}", "No documents.".yellow());
        return;
    }

    if data.len() <= FULL_DOCUMENT_LIMIT || !data.iter().all(Value::is_object) {
        for doc in data {
            println!("{}", pretty(doc));
        }
        return;
    }

    let mut fields: Vec<String> = Vec::new();
    for doc in data {
        if let Some(obj) = doc.as_object() {
            for key in obj.keys() {
                if !fields.contains(key) {
                    fields.push(key.clone());
                }
            }
        }
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        fields
            .iter()
            .map(|f| Cell::new(f).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );

    for doc in data {
        if let Some(obj) = doc.as_object() {
            let row: Vec<String> = fields
                .iter()
                .map(|field| match obj.get(field) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Null) => "null".to_string(),
                    Some(v) => v.to_string(),
                    None => String::new(),
                })
                .collect();
            table.add_row(row);
        }
    }

    println!("{table}");
    println!("\n{}", format!("{} documents", data.len()).green());
}

pub fn display_connections(connections: &[Connection]) {
    if connections.is_empty() {
        println!("{}", "No connections saved. Add one with \\add <name> <uri>.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("").add_attribute(Attribute::Bold),
        Cell::new("id").add_attribute(Attribute::Bold),
        Cell::new("name").add_attribute(Attribute::Bold),
        Cell::new("target").add_attribute(Attribute::Bold),
        Cell::new("user").add_attribute(Attribute::Bold),
    ]);

    for conn in connections {
        let description = describe_uri(&conn.uri);
        table.add_row(vec![
            if conn.is_active { "*" } else { "" }.to_string(),
            conn.id.clone(),
            conn.display_name.clone(),
            description.target_label.unwrap_or_default(),
            description.username.unwrap_or_default(),
        ]);
    }
    println!("{table}");
}

pub fn display_collections(snapshot: &CollectionsSnapshot) {
    match snapshot.status {
        CollectionsStatus::Idle => println!("{}", "No active connection.".yellow()),
        CollectionsStatus::Loading => println!("{}", "Loading collections...".cyan()),
        CollectionsStatus::Error => println!(
            "{}",
            format!(
                "Failed to load collections: {}",
                snapshot.error.as_deref().unwrap_or("unknown error")
            )
            .red()
        ),
        CollectionsStatus::Loaded => {
            if snapshot.names.is_empty() {
                println!("{}", "The connection has no collections.".yellow());
            } else {
                for name in &snapshot.names {
                    println!("  {}", name);
                }
            }
            if snapshot.read_only == Some(true) {
                println!("{}", "Read-only privileges.".dark_grey());
            }
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
