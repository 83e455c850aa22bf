//! Command implementations for the RestPose CLI.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::client::{Server, WaitOptions};
use crate::config::ClientConfig;
use crate::error::{RestPoseError, Result};
use crate::query::{CombineOp, OrderKey, Query, QueryTarget, Searchable, TargetExt};

/// Execute a CLI command.
pub fn execute_command(args: RestPoseArgs) -> Result<()> {
    let server = Server::with_config(load_config(&args)?)?;
    match &args.command {
        Command::Status => show_status(&server, &args),
        Command::Collections => list_collections(&server, &args),
        Command::Search(search_args) => search(&server, search_args, &args),
        Command::Checkpoint(checkpoint_args) => checkpoint(&server, checkpoint_args, &args),
        Command::GetDoc(get_doc_args) => get_doc(&server, get_doc_args, &args),
    }
}

/// Build the client configuration from the config file, environment and flags.
pub fn load_config(args: &RestPoseArgs) -> Result<ClientConfig> {
    let config = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "loading client configuration");
            ClientConfig::from_file(path)?
        }
        None => ClientConfig::default(),
    };
    let config = match &args.uri {
        Some(uri) => config.with_uri(uri.clone()),
        None => config,
    };
    config.validate()?;
    Ok(config)
}

fn show_status(server: &Server, args: &RestPoseArgs) -> Result<()> {
    let status = server.status()?;
    output_result(&format!("Status of {}", server.uri()), &status, args)
}

fn list_collections(server: &Server, args: &RestPoseArgs) -> Result<()> {
    let collections = server.collections()?;
    output_result("Collections", &collections, args)
}

/// Split a `FIELD=VALUE` argument.
pub fn parse_field_value(arg: &str) -> Result<(&str, &str)> {
    match arg.split_once('=') {
        Some((field, value)) if !field.is_empty() => Ok((field, value)),
        _ => Err(RestPoseError::invalid_argument(format!(
            "expected FIELD=VALUE, got {arg:?}"
        ))),
    }
}

/// Parse an ordering key: `relevance`, `FIELD`, `FIELD:asc` or `FIELD:desc`.
pub fn parse_order_key(arg: &str) -> Result<OrderKey> {
    if arg == "relevance" {
        return Ok(OrderKey::relevance());
    }
    match arg.rsplit_once(':') {
        Some((field, "asc")) => Ok(OrderKey::field(field).ascending(true)),
        Some((field, "desc")) => Ok(OrderKey::field(field).ascending(false)),
        Some((_, direction)) => Err(RestPoseError::invalid_argument(format!(
            "unknown sort direction {direction:?}"
        ))),
        None => Ok(OrderKey::field(arg)),
    }
}

/// Build the searchable described by the search arguments.
fn build_search<T: QueryTarget + 'static>(target: &Arc<T>, args: &SearchArgs) -> Result<Searchable> {
    let mut conditions = Vec::new();
    for arg in &args.is {
        let (field, value) = parse_field_value(arg)?;
        conditions.push(target.field(field).equals(value));
    }
    for arg in &args.text {
        let (field, text) = parse_field_value(arg)?;
        conditions.push(target.field(field).text(text));
    }
    let query = match conditions.len() {
        0 => target.all(),
        1 => conditions.remove(0),
        _ => Query::combine(CombineOp::And, conditions)?,
    };

    let keys = args
        .order_by
        .iter()
        .map(String::as_str)
        .map(parse_order_key)
        .collect::<Result<Vec<_>>>()?;
    let searchable = if keys.is_empty() {
        query.searchable()
    } else {
        query.order_by_multiple(keys)
    };
    if args.count {
        return Ok(searchable);
    }
    searchable.slice(args.from..args.from.saturating_add(args.size))
}

fn run_search<T: QueryTarget + 'static>(
    target: &Arc<T>,
    search_args: &SearchArgs,
    args: &RestPoseArgs,
) -> Result<()> {
    let searchable = build_search(target, search_args)?;
    if search_args.count {
        let count = CountOutput {
            matches: searchable.len()?,
        };
        return output_result("Matching documents", &count, args);
    }

    let mut items = Vec::new();
    for result in searchable.iter() {
        let result = result?;
        items.push(ResultItemOutput {
            rank: result.rank(),
            data: result.data().clone(),
        });
    }
    let output = SearchOutput {
        total_docs: searchable.total_docs()?,
        matches_lower_bound: searchable.matches_lower_bound()?,
        matches_estimated: searchable.matches_estimated()?,
        matches_upper_bound: searchable.matches_upper_bound()?,
        has_more: searchable.has_more()?,
        items,
    };
    output_result(&format!("Results for {searchable}"), &output, args)
}

fn search(server: &Server, search_args: &SearchArgs, args: &RestPoseArgs) -> Result<()> {
    let coll = server.collection(&search_args.collection);
    match &search_args.doc_type {
        Some(doc_type) => run_search(&coll.doc_type(doc_type), search_args, args),
        None => run_search(&coll, search_args, args),
    }
}

fn checkpoint(server: &Server, checkpoint_args: &CheckpointArgs, args: &RestPoseArgs) -> Result<()> {
    let coll = server.collection(&checkpoint_args.collection);
    let chk = coll.checkpoint(!checkpoint_args.no_commit, None)?;
    if checkpoint_args.wait {
        let mut options = WaitOptions::new(server.config().checkpoint_poll_interval());
        if let Some(secs) = checkpoint_args.timeout_secs {
            options = options.with_timeout(Duration::from_secs(secs));
        }
        chk.wait_with(&options)?;
    }
    let output = CheckpointOutput {
        check_id: chk.check_id().to_string(),
        reached: chk.reached()?,
        total_errors: chk.total_errors()?,
        errors: chk.errors()?,
    };
    output_result("Checkpoint", &output, args)
}

fn get_doc(server: &Server, get_doc_args: &GetDocArgs, args: &RestPoseArgs) -> Result<()> {
    let coll = server.collection(&get_doc_args.collection);
    let doc = coll.get_doc(&get_doc_args.doc_type, &get_doc_args.doc_id);
    let output = DocumentOutput {
        data: doc.data()?,
        terms: doc.terms()?,
        values: doc.values()?,
    };
    output_result(
        &format!("Document {}/{}", get_doc_args.doc_type, get_doc_args.doc_id),
        &output,
        args,
    )
}
