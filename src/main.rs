use anyhow::{bail, Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use facet_query::condition::Condition;
use facet_query::facet::{wrap_like, Facet};
use facet_query::filter::SEARCH_FIELD;
use facet_query::sql_compiler::{CompilerConfig, SqlCompiler};
use facet_query::url_codec::decode_selections;
use facet_query::{
    ListConfig, ListController, MemoryPersistence, Pagination, QueryVariables, RouteState, SearchSelections,
    Selection, Sorting, SortingOrder,
};

const DEFAULT_CONFIG_PATH: &str = "list_config.json";

const HELP: &str = "\
commands:
  search <text>           free-text search
  search <selections>     compact selections, e.g. [[{\"f\":\"name\",\"c\":{\"like\":{\"value\":\"a\"}}}]]
  search                  clear the search
  nav <id>|root           show the children of <id>, or the top-level items
  page <index> <size>     change page
  sort <field> [ASC|DESC] change sorting
  context <json>          set the contextual query variables
  show                    print the merged query variables
  sql                     print the SQL for the current state
  url                     print the current route
  help | quit";

/// Load the list configuration, falling back to defaults
fn load_config(path: &str) -> ListConfig {
    match ListConfig::from_json_file(path) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "using default list configuration");
            ListConfig::default()
        }
    }
}

fn demo_facets() -> Vec<Facet> {
    vec![
        Facet::dropdown("Name", "name", "text").with_transform(wrap_like),
        Facet::dropdown("Status", "status", "select"),
        Facet::dropdown("Parent name", "parent.name", "text").with_transform(wrap_like),
        Facet::flag("Visible", "isVisible", Condition::equal(true)),
    ]
}

fn parse_search(argument: &str) -> Result<SearchSelections> {
    if argument.is_empty() {
        return Ok(SearchSelections::default());
    }
    if argument.starts_with('[') || argument.starts_with("%5B") {
        return decode_selections(argument).context("invalid search selections");
    }
    Ok(SearchSelections::single(vec![Selection::new(SEARCH_FIELD, Condition::like(argument))]))
}

fn execute(list: &mut ListController<MemoryPersistence>, compiler: &SqlCompiler, line: &str) -> Result<bool> {
    let (command, argument) = line.split_once(' ').unwrap_or((line, ""));
    let argument = argument.trim();

    match command {
        "search" => list.search(parse_search(argument)?),
        "nav" => {
            let ancestor = Some(argument).filter(|id| *id != "root");
            let route = list.child_route(ancestor);
            list.on_route_change(route);
        }
        "page" => {
            let mut parts = argument.split_whitespace();
            let (Some(index), Some(size)) = (parts.next(), parts.next()) else {
                bail!("usage: page <index> <size>");
            };
            let page_index = index.parse().context("invalid page index")?;
            let page_size: u64 = size.parse().context("invalid page size")?;
            if page_size == 0 {
                bail!("page size must be positive");
            }
            list.paginate(Pagination::new(page_index, page_size));
        }
        "sort" => {
            let mut parts = argument.split_whitespace();
            let Some(field) = parts.next() else {
                bail!("usage: sort <field> [ASC|DESC]");
            };
            let order = match parts.next().map(str::to_uppercase).as_deref() {
                None | Some("ASC") => SortingOrder::Asc,
                Some("DESC") => SortingOrder::Desc,
                Some(other) => bail!("unknown order {}", other),
            };
            list.sort(vec![Sorting::new(field, order)]);
        }
        "context" => {
            let variables: QueryVariables = serde_json::from_str(argument).context("invalid query variables")?;
            list.set_context_variables(variables);
        }
        "show" => println!("{}", serde_json::to_string_pretty(list.variables())?),
        "sql" => {
            let select = compiler.compile(list.variables())?;
            let count = compiler.compile_count(list.variables())?;
            println!("{}\n{}", select.sql, count.sql);
            for optimization in &select.optimizations {
                println!("• {:?}", optimization);
            }
        }
        "url" => println!("{}", list.route()),
        "help" => println!("{}", HELP),
        "quit" | "exit" => return Ok(false),
        "" => {}
        other => bail!("unknown command {}, try help", other),
    }
    Ok(true)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config(&path);
    let compiler = SqlCompiler::from_config(CompilerConfig::from_list_config(&config));
    let route: RouteState = format!("/{}", config.table).parse().context("invalid table name")?;

    let mut list = ListController::new(config, demo_facets(), MemoryPersistence::new());
    list.init(route);
    info!(route = %list.route(), "list ready, type help for commands");

    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("facet> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line)?;
                match execute(&mut list, &compiler, line) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => println!("error: {:#}", e),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
