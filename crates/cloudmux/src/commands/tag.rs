use crate::TagCommands;
use crate::output;
use cloudmux_core::ControlPlane;
use cloudmux_driver::KeyValue;
use colored::Colorize;
use serde_json::json;

fn print_tags(tags: &[KeyValue]) {
    if tags.is_empty() {
        println!("{}", "No tags".dimmed());
        return;
    }
    for tag in tags {
        println!("  {:<24} {}", tag.key.cyan(), tag.value);
    }
}

pub async fn handle(plane: &ControlPlane, cmd: TagCommands, json: bool) -> anyhow::Result<()> {
    match cmd {
        TagCommands::Add {
            connection,
            kind,
            name,
            tag,
        } => {
            let tag = plane.add_tag(&connection, kind, &name, tag).await?;
            if json {
                return output::print_json(&tag);
            }
            output::success(format!("Tagged {} {} with {}={}", kind, name.cyan(), tag.key, tag.value));
        }
        TagCommands::List {
            connection,
            kind,
            name,
        } => {
            let tags = plane.list_tag(&connection, kind, &name).await?;
            if json {
                return output::print_json(&tags);
            }
            println!("{} {}", kind.to_string().bold(), name.cyan());
            print_tags(&tags);
        }
        TagCommands::Get {
            connection,
            kind,
            name,
            key,
        } => {
            let tag = plane.get_tag(&connection, kind, &name, &key).await?;
            if json {
                return output::print_json(&tag);
            }
            println!("{}", tag.value);
        }
        TagCommands::Remove {
            connection,
            kind,
            name,
            key,
        } => {
            let removed = plane.remove_tag(&connection, kind, &name, &key).await?;
            if json {
                return output::print_json(&json!({ "Result": removed }));
            }
            output::success(format!("Removed tag {} from {} {}", key, kind, name.cyan()));
        }
        TagCommands::Find {
            connection,
            kind,
            keyword,
        } => {
            let found = plane.find_tag(&connection, kind, &keyword).await?;
            if json {
                return output::print_json(&found);
            }
            if found.is_empty() {
                println!("{}", format!("No {} tagged {}", kind, keyword).dimmed());
                return Ok(());
            }
            for info in found {
                let name = if info.res_iid.name_id.is_empty() {
                    "-".dimmed()
                } else {
                    info.res_iid.name_id.cyan()
                };
                println!("{:<32} {}", name, info.res_iid.system_id);
                print_tags(&info.tag_list);
            }
        }
    }
    Ok(())
}
