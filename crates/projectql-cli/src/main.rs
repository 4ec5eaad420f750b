mod cli;
mod demo;

use std::fs;

use clap::Parser;
use projectql::authz::RoleSetPrincipal;
use projectql::{Request, execute_request};

use cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logger(&cli);

    let query = match (&cli.query, &cli.file) {
        (Some(query), None) => query.clone(),
        (None, Some(path)) => fs::read_to_string(path)?,
        (Some(_), Some(_)) => unreachable!("clap enforces --file and QUERY are mutually exclusive"),
        (None, None) => anyhow::bail!("provide an operation document, either inline or via --file"),
    };

    let variables = match &cli.variables {
        Some(raw) => match serde_json::from_str(raw)? {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            other => anyhow::bail!("--variables must be a JSON object, got {other}"),
        },
        None => Default::default(),
    };

    let mut request = Request::new(query).with_variables(variables);
    if let Some(operation_name) = &cli.operation_name {
        request = request.with_operation_name(operation_name.clone());
    }

    let store = demo::Store::seeded();
    let projects = demo::seed_projects();
    let schema = demo::build_schema(&store);
    let root = demo::build_root(&store, &projects);

    let principal: RoleSetPrincipal = if cli.admin {
        demo::admin_principal()
    } else {
        RoleSetPrincipal::new(std::iter::empty())
    };

    let response = execute_request(&schema, &root, &request, &principal, &());
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}

fn setup_logger(cli: &Cli) {
    let log_level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(log_level).init();
}
