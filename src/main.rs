// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use facetdex::binary::header::{IndexFooter, IndexHeader};
use facetdex::build::{run_index, BuildSummary};
use facetdex::config::{NamespaceRegistry, Settings};
use facetdex::index::{DocBase, FacetConjunction, IndexOptions, IndexReader, ResultSet, SearchIndex};
use facetdex::navigation::{FacetedNavigation, NavPath, NavigationNode};
use facetdex::sortable;

mod cli;
use cli::display::{self, Tone};
use cli::{Cli, Commands};

type CliResult = Result<(), Box<dyn Error>>;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Index {
            settings,
            input,
            output,
            batch_size,
            quiet,
        } => cmd_index(&settings, &input, &output, batch_size, !quiet),
        Commands::Inspect { file, top } => cmd_inspect(&file, top),
        Commands::Query {
            file,
            settings,
            facets,
            text,
            base,
            limit,
            json,
        } => cmd_query(
            &file,
            settings.as_deref(),
            &facets,
            text.as_deref(),
            base,
            limit,
            json,
        ),
        Commands::Navigate {
            file,
            settings,
            search,
            path,
            json,
        } => cmd_navigate(&file, &settings, &search, &path, json),
    };

    if let Err(e) = result {
        eprintln!("{} {}", display::paint(Tone::Bad, true, "error:"), e);
        std::process::exit(1);
    }
}

/// `warn` by default, raised by each `-v`. `RUST_LOG` wins when set.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

// ============================================================================
// INDEX
// ============================================================================

fn cmd_index(
    settings: &Path,
    input: &Path,
    output: &Path,
    batch_size: usize,
    show_progress: bool,
) -> CliResult {
    let settings = Settings::load(settings)?;
    let summary = run_index(&settings, input, output, batch_size, show_progress)?;
    print_build_summary(output, &summary);
    Ok(())
}

fn print_build_summary(output: &Path, summary: &BuildSummary) {
    let size = fs::metadata(output).map(|m| m.len()).unwrap_or(0);

    println!();
    display::section_top("INDEX");
    display::key_value("file", &output.display().to_string());
    display::key_value("size", &display::format_size(size));
    display::key_value("generation", &summary.stats.generation.to_string());
    display::section_mid("NODES");
    display::key_value("dump files", &summary.files.to_string());
    display::key_value("indexed", &summary.indexed.to_string());
    display::key_value("unchanged", &summary.unchanged.to_string());
    display::key_value("stale revisions", &summary.stale.to_string());
    display::key_value("live documents", &summary.stats.live_docs.to_string());
    display::key_value("facet fields", &summary.stats.facet_fields.to_string());
    display::key_value("status", &display::failures(summary.failed.len()));
    for failure in summary.failed.iter().take(10) {
        display::row(&format!(
            "  {}",
            display::paint(Tone::Bad, false, &failure.to_string())
        ));
    }
    if summary.failed.len() > 10 {
        display::row(&format!("  … {} more", summary.failed.len() - 10));
    }
    display::section_mid("TIME");
    display::key_value("elapsed", &display::timing_ms(summary.elapsed_ms as f64));
    display::section_bot();
}

// ============================================================================
// INSPECT
// ============================================================================

fn cmd_inspect(file: &Path, top: usize) -> CliResult {
    let bytes = fs::read(file)?;
    let header = IndexHeader::read(&bytes)?;
    let footer = IndexFooter::read(&bytes)?;
    let content_end = bytes.len().saturating_sub(IndexFooter::SIZE);
    let computed = IndexFooter::compute_crc32(&bytes[..content_end]);

    let index = SearchIndex::open(file, IndexOptions::default())?;
    let reader = index.reader()?;
    let stats = reader.stats();

    println!();
    display::section_top("FILE");
    display::key_value("path", &file.display().to_string());
    display::key_value("size", &display::format_size(bytes.len() as u64));
    display::key_value("format version", &header.version.to_string());
    display::key_value("full-text terms", &header.flags.has_terms().to_string());
    display::key_value("docs section", &display::format_size(u64::from(header.docs_len)));
    let crc = if footer.crc32 == computed {
        display::paint(Tone::Good, true, &format!("{:#010x} OK", footer.crc32))
    } else {
        display::paint(Tone::Bad, true, &format!("{:#010x} MISMATCH", footer.crc32))
    };
    display::key_value("crc32", &crc);

    display::section_mid("INDEX");
    display::key_value("generation", &stats.generation.to_string());
    display::key_value("documents", &stats.live_docs.to_string());
    display::key_value("facet fields", &stats.facet_fields.to_string());
    display::key_value("distinct terms", &stats.distinct_terms.to_string());

    let snapshot = reader.snapshot();
    let mut fields: Vec<&str> = snapshot.facet_names().collect();
    fields.sort_unstable();
    for field in fields {
        let Some(values) = snapshot.facet(field) else {
            continue;
        };
        let kind = values
            .kind()
            .map_or_else(|| "mixed".to_string(), |k| format!("{:?}", k));
        display::section_mid(&format!("{} ({}, {} values)", field, kind, values.distinct()));

        let mut counted: Vec<(&str, usize)> = values.iter().map(|(v, p)| (v, p.len())).collect();
        counted.sort_by(|a, b| b.1.cmp(&a.1));
        let max = counted.first().map_or(0, |(_, n)| *n);
        for (value, n) in counted.into_iter().take(top) {
            let label = match values.kind_of(value) {
                Some(kind) => sortable::label(kind, value),
                None => value.to_string(),
            };
            display::row(&format!(
                "  {} {} {}",
                display::pad_right(&display::truncate(&label, 36), 36),
                display::count(n, 8),
                display::bar(n, max, 20)
            ));
        }
    }
    display::section_bot();
    Ok(())
}

// ============================================================================
// QUERY
// ============================================================================

fn load_settings(settings: Option<&Path>) -> Result<Settings, Box<dyn Error>> {
    Ok(match settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    })
}

/// Translate `name=value` arguments into index fields and tokens.
fn parse_constraints(
    facets: &[String],
    namespaces: &NamespaceRegistry,
    reader: &IndexReader,
) -> Result<FacetConjunction, Box<dyn Error>> {
    let mut conjunction = FacetConjunction::new();
    for constraint in facets {
        let Some((name, value)) = constraint.split_once('=') else {
            return Err(format!("facet constraint '{}' is not name=value", constraint).into());
        };
        let field = namespaces.resolve(name.trim())?.expanded();
        let token = match reader.facet_kind(&field) {
            Some(kind) => sortable::token_for(kind, value.trim()).ok_or_else(|| {
                format!("'{}' is not a valid {:?} value for {}", value, kind, name)
            })?,
            None => value.trim().to_string(),
        };
        conjunction.push(field, token);
    }
    Ok(conjunction)
}

fn cmd_query(
    file: &Path,
    settings: Option<&Path>,
    facets: &[String],
    text: Option<&str>,
    base: Option<String>,
    limit: usize,
    json: bool,
) -> CliResult {
    let settings = load_settings(settings)?;
    let index = SearchIndex::open(file, settings.index)?;
    let reader = index.reader()?;
    let namespaces = settings.namespace_registry();
    let conjunction = parse_constraints(facets, &namespaces, &reader)?;
    let base = base.map_or(DocBase::All, DocBase::Subtree);
    let token = settings.navigation.token();

    let started = Instant::now();
    let results = match text {
        Some(text) => {
            let hits = reader.search_text(text, &base, &token)?;
            if conjunction.is_empty() {
                hits
            } else {
                let facet_hits = reader.query(&conjunction, &base, &token)?;
                ResultSet {
                    nodes: hits
                        .nodes
                        .into_iter()
                        .filter(|n| facet_hits.contains(&n.node_id))
                        .collect(),
                }
            }
        }
        None => reader.query(&conjunction, &base, &token)?,
    };
    let elapsed = started.elapsed().as_secs_f64() * 1000.0;

    if json {
        let page = ResultSet {
            nodes: results.page(0, limit).to_vec(),
        };
        println!(
            "{}",
            serde_json::json!({ "total": results.len(), "results": page })
        );
        return Ok(());
    }

    println!();
    display::section_top(&format!("{} RESULTS", results.len()));
    for result in results.page(0, limit) {
        display::row(&format!(
            "  {}  {}",
            display::paint(Tone::Value, false, &display::truncate(&result.path, 44)),
            display::paint(Tone::Muted, false, result.node_id.as_str())
        ));
    }
    if results.len() > limit {
        display::row(&format!("  … {} more", results.len() - limit));
    }
    display::section_mid("TIME");
    display::key_value("query", &display::timing_ms(elapsed));
    display::section_bot();
    Ok(())
}

// ============================================================================
// NAVIGATE
// ============================================================================

/// Rewrite human readable values (`2024-03-01T00:00:00Z`, `42`) into the
/// tokens paths carry. Raw tokens need the `0x` prefix. Steps that cannot be
/// rewritten are left for the navigation service to reject.
fn tokenize_path(
    navigation: &FacetedNavigation,
    search: &str,
    path: &str,
    reader: &IndexReader,
) -> String {
    let (Some(search), Ok(parsed)) = (navigation.search(search), NavPath::parse(path)) else {
        return path.to_string();
    };
    let mut rewritten = NavPath::root();
    for (depth, (facet, value)) in parsed.steps().enumerate() {
        let token = search
            .field(depth)
            .and_then(|field| reader.facet_kind(field))
            .and_then(|kind| sortable::token_for(kind, value))
            .unwrap_or_else(|| value.to_string());
        rewritten = rewritten.child(facet, token);
    }
    rewritten.to_string()
}

fn cmd_navigate(file: &Path, settings: &Path, search: &str, path: &str, json: bool) -> CliResult {
    let settings = Settings::load(settings)?;
    let index = Arc::new(SearchIndex::open(file, settings.index)?);
    let navigation = FacetedNavigation::from_settings(&settings, Arc::clone(&index))?;
    if navigation.search(search).is_none() {
        let known = navigation.search_ids().join(", ");
        return Err(format!("unknown facet search '{}' (defined: {})", search, known).into());
    }

    let path = tokenize_path(&navigation, search, path, &index.reader()?);
    let started = Instant::now();
    let node = navigation.node(search, &path)?;
    let elapsed = started.elapsed().as_secs_f64() * 1000.0;

    if json {
        println!("{}", serde_json::to_string_pretty(node.as_ref())?);
        return Ok(());
    }
    print_navigation_node(&node, elapsed);
    Ok(())
}

fn print_navigation_node(node: &NavigationNode, elapsed: f64) {
    let title = if node.path.is_empty() {
        node.search.clone()
    } else {
        format!("{} / {}", node.search, node.path)
    };
    println!();
    display::section_top(&title);
    display::key_value("count", &node.count.to_string());

    match (&node.next_facet, &node.result_set) {
        (Some(facet), _) => {
            display::section_mid(facet);
            let max = node.children.iter().map(|c| c.count).max().unwrap_or(0);
            for child in &node.children {
                display::row(&format!(
                    "  {} {} {}",
                    display::pad_right(&display::truncate(&child.label, 36), 36),
                    display::count(child.count, 8),
                    display::bar(child.count, max, 20)
                ));
            }
            if node.children.is_empty() {
                display::row(&format!("  {}", display::paint(Tone::Muted, false, "(no values)")));
            }
        }
        (None, Some(results)) => {
            display::section_mid("NODES");
            for result in results.page(0, 50) {
                display::row(&format!(
                    "  {}",
                    display::paint(Tone::Value, false, &result.path)
                ));
            }
            if results.len() > 50 {
                display::row(&format!("  … {} more", results.len() - 50));
            }
        }
        (None, None) => {}
    }
    display::section_mid("TIME");
    display::key_value("navigate", &display::timing_ms(elapsed));
    display::section_bot();
}
