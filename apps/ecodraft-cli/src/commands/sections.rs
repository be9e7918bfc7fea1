// sections.rs — `ecodraft sections`: print the section registry.

use ecodraft_schema::list_sections;
use serde_json::json;

pub fn execute(as_json: bool) -> anyhow::Result<()> {
    if as_json {
        let rows: Vec<_> = list_sections()
            .iter()
            .map(|id| {
                json!({
                    "section": id.as_str(),
                    "shape": id.shape(),
                    "mandatory": id.is_mandatory(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{:<26} {:<18} {}", "SECTION", "SHAPE", "REQUIRED");
    println!("{}", "-".repeat(54));
    for id in list_sections() {
        println!(
            "{:<26} {:<18} {}",
            id.as_str(),
            id.shape().to_string(),
            if id.is_mandatory() { "yes" } else { "" }
        );
    }
    println!("\n{} section(s).", list_sections().len());
    Ok(())
}
