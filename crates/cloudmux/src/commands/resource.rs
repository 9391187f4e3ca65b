use crate::output;
use cloudmux_core::ControlPlane;
use cloudmux_driver::{Iid, ResourceKind};
use colored::Colorize;
use serde_json::json;

fn print_section(title: &str, iids: &[Iid]) {
    println!("{} ({})", title.bold(), iids.len());
    for iid in iids {
        let name = if iid.name_id.is_empty() {
            "-".dimmed()
        } else {
            iid.name_id.cyan()
        };
        println!("  {:<32} {}", name, iid.system_id);
    }
}

pub async fn handle_resources(
    plane: &ControlPlane,
    connection: &str,
    kind: ResourceKind,
    json: bool,
) -> anyhow::Result<()> {
    let list = plane.all_resource_list(connection, kind).await?;
    if json {
        return output::print_json(&json!({
            "ResourceType": kind,
            "AllList": list,
        }));
    }

    println!("{} on {}", kind.to_string().bold(), connection.cyan());
    print_section("Mapped", &list.mapped);
    print_section("Only in cloudmux", &list.only_spider);
    print_section("Only at provider", &list.only_csp);
    Ok(())
}

pub async fn handle_names(
    plane: &ControlPlane,
    connection: &str,
    kind: ResourceKind,
    json: bool,
) -> anyhow::Result<()> {
    let names = plane.list_resource_names(connection, kind).await?;
    if json {
        return output::print_json(&names);
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

pub async fn handle_delete(
    plane: &ControlPlane,
    connection: &str,
    kind: ResourceKind,
    name: &str,
    force: bool,
    json: bool,
) -> anyhow::Result<()> {
    let result = plane.delete_resource(connection, kind, name, force).await?;
    if json {
        return output::print_json(&result);
    }

    match result.vm_status {
        Some(status) => output::success(format!("{} {} is {}", kind, name.cyan(), status)),
        None if result.result => output::success(format!("Deleted {} {}", kind, name.cyan())),
        None => println!("{} {} {} was not deleted", "!".yellow(), kind, name),
    }
    Ok(())
}

/// Always JSON; the record's shape depends on the kind
pub async fn handle_get_csp(
    plane: &ControlPlane,
    connection: &str,
    kind: ResourceKind,
    system_id: &str,
) -> anyhow::Result<()> {
    let info = plane.get_csp_resource_info(connection, kind, system_id).await?;
    output::print_json(&info)
}

pub async fn handle_delete_csp(
    plane: &ControlPlane,
    connection: &str,
    kind: ResourceKind,
    system_id: &str,
    json: bool,
) -> anyhow::Result<()> {
    let result = plane.delete_csp_resource(connection, kind, system_id).await?;
    if json {
        return output::print_json(&result);
    }

    match result.vm_status {
        Some(status) => output::success(format!("{} {} is {}", kind, system_id, status)),
        None if result.result => output::success(format!("Deleted {} {} at the provider", kind, system_id)),
        None => println!("{} {} {} was not deleted", "!".yellow(), kind, system_id),
    }
    Ok(())
}

pub async fn handle_register(
    plane: &ControlPlane,
    connection: &str,
    kind: ResourceKind,
    name: &str,
    system_id: &str,
    json: bool,
) -> anyhow::Result<()> {
    let iid = plane.register(connection, kind, name, system_id).await?;
    if json {
        return output::print_json(&iid);
    }
    output::success(format!(
        "Registered {} {} as {}",
        kind,
        iid.system_id,
        iid.name_id.cyan()
    ));
    Ok(())
}

pub async fn handle_unregister(
    plane: &ControlPlane,
    connection: &str,
    kind: ResourceKind,
    name: &str,
    json: bool,
) -> anyhow::Result<()> {
    let removed = plane.unregister(connection, kind, name).await?;
    if json {
        return output::print_json(&json!({ "Result": removed }));
    }
    output::success(format!("Unregistered {} {}", kind, name.cyan()));
    Ok(())
}
