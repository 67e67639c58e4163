use kiln_core::VERSION;
use miette::Result;

pub fn run(json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::json!({ "name": "kiln", "version": VERSION })
        );
    } else {
        println!("kiln {VERSION}");
    }
    Ok(())
}
