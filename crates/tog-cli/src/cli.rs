//! Subcommand dispatch (spec §6): `log`, `diff`, `blame`, `tree`, `ref`,
//! the `-h`/`-V` globals, and the argv[1]-not-a-subcommand fallback to
//! `log <path>`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tog_hash::ObjectId;
use tog_repo::Repository;
use tog_tui::{BlameView, ColorConfig, DiffSide, DiffView, LogView, RefView, TreeView, ViewKind};

use crate::app;
use crate::screen::TermScreen;

const USAGE: &str = "\
usage: tog [-h] [-V] <command> [args]

commands:
    log    [-b] [-c commit] [-r repo-path] [path]
    diff   [-a] [-C n] [-r repo-path] [-w] object1 object2
    blame  [-c commit] [-r repo-path] path
    tree   [-c commit] [-r repo-path] [path]
    ref    [-r repo-path]
";

pub fn run(program: &str, args: &[String]) -> anyhow::Result<i32> {
    if args.is_empty() {
        return open(program, ViewKindRequest::Log(LogArgs::default()));
    }

    match args[0].as_str() {
        "-h" | "--help" => {
            print!("{USAGE}");
            Ok(if args.len() == 1 { 0 } else { 1 })
        }
        "-V" | "--version" => {
            println!("tog {}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
        "log" => open(program, ViewKindRequest::Log(LogArgs::try_parse_from(with_program("tog log", &args[1..]))?)),
        "diff" => open(program, ViewKindRequest::Diff(DiffArgs::try_parse_from(with_program("tog diff", &args[1..]))?)),
        "blame" => open(program, ViewKindRequest::Blame(BlameArgs::try_parse_from(with_program("tog blame", &args[1..]))?)),
        "tree" => open(program, ViewKindRequest::Tree(TreeArgs::try_parse_from(with_program("tog tree", &args[1..]))?)),
        "ref" => open(program, ViewKindRequest::Ref(RefArgs::try_parse_from(with_program("tog ref", &args[1..]))?)),
        other => run_fallback(program, other),
    }
}

fn with_program<'a>(program: &'a str, rest: &'a [String]) -> impl Iterator<Item = &'a str> {
    std::iter::once(program).chain(rest.iter().map(String::as_str))
}

#[derive(Parser, Default)]
#[command(name = "tog log", disable_help_flag = true, disable_version_flag = true)]
struct LogArgs {
    #[arg(short = 'b')]
    branches: bool,
    #[arg(short = 'c')]
    commit: Option<String>,
    #[arg(short = 'r')]
    repo: Option<PathBuf>,
    path: Option<String>,
}

#[derive(Parser)]
#[command(name = "tog diff", disable_help_flag = true, disable_version_flag = true)]
struct DiffArgs {
    #[arg(short = 'a')]
    force_text: bool,
    #[arg(short = 'C')]
    context: Option<u32>,
    #[arg(short = 'r')]
    repo: Option<PathBuf>,
    #[arg(short = 'w')]
    ignore_whitespace: bool,
    objects: Vec<String>,
}

#[derive(Parser)]
#[command(name = "tog blame", disable_help_flag = true, disable_version_flag = true)]
struct BlameArgs {
    #[arg(short = 'c')]
    commit: Option<String>,
    #[arg(short = 'r')]
    repo: Option<PathBuf>,
    path: String,
}

#[derive(Parser)]
#[command(name = "tog tree", disable_help_flag = true, disable_version_flag = true)]
struct TreeArgs {
    #[arg(short = 'c')]
    commit: Option<String>,
    #[arg(short = 'r')]
    repo: Option<PathBuf>,
    path: Option<String>,
}

#[derive(Parser)]
#[command(name = "tog ref", disable_help_flag = true, disable_version_flag = true)]
struct RefArgs {
    #[arg(short = 'r')]
    repo: Option<PathBuf>,
}

enum ViewKindRequest {
    Log(LogArgs),
    Diff(DiffArgs),
    Blame(BlameArgs),
    Tree(TreeArgs),
    Ref(RefArgs),
}

fn discover_repo(repo_opt: &Option<PathBuf>) -> anyhow::Result<Arc<Repository>> {
    let start = match repo_opt {
        Some(p) => p.clone(),
        None => std::env::current_dir()?,
    };
    Ok(Arc::new(Repository::discover(&start)?))
}

fn resolve_commit(repo: &Repository, spec: Option<&str>) -> anyhow::Result<ObjectId> {
    match spec {
        Some(s) => Ok(repo.resolve_commitish(s)?),
        None => {
            let head = repo.head_oid()?.ok_or_else(|| anyhow::anyhow!("no HEAD in this repository"))?;
            Ok(repo.peel_to_commit(head)?)
        }
    }
}

fn resolve_diff_object(repo: &Repository, spec: &str) -> anyhow::Result<Option<ObjectId>> {
    if spec == "-" {
        return Ok(None);
    }
    if let Ok(oid) = ObjectId::from_hex(spec) {
        return Ok(Some(oid));
    }
    Ok(Some(repo.resolve_commitish(spec)?))
}

fn open(program: &str, request: ViewKindRequest) -> anyhow::Result<i32> {
    let colors = Arc::new(ColorConfig::from_env());
    let view = match request {
        ViewKindRequest::Log(args) => {
            let repo = discover_repo(&args.repo)?;
            let start = args.commit.as_deref().map(|s| resolve_commit(&repo, Some(s))).transpose()?;
            match start {
                Some(oid) => ViewKind::Log(LogView::open_at(repo, oid)),
                None => ViewKind::Log(LogView::open(repo, args.path, args.branches)),
            }
        }
        ViewKindRequest::Diff(args) => {
            let repo = discover_repo(&args.repo)?;
            if args.objects.len() != 2 {
                eprintln!("{program}: diff requires exactly two object specs");
                return Ok(1);
            }
            let old_oid = resolve_diff_object(&repo, &args.objects[0])?;
            let new_oid = resolve_diff_object(&repo, &args.objects[1])?;
            let mut diff = DiffView::new(
                repo,
                colors,
                DiffSide { label: "a".to_string(), oid: old_oid },
                DiffSide { label: "b".to_string(), oid: new_oid },
                None,
            )?;
            diff.set_options(args.context.unwrap_or(3), args.ignore_whitespace, args.force_text)?;
            ViewKind::Diff(diff)
        }
        ViewKindRequest::Blame(args) => {
            let repo = discover_repo(&args.repo)?;
            let commit = resolve_commit(&repo, args.commit.as_deref())?;
            ViewKind::Blame(BlameView::open(repo, commit, args.path)?)
        }
        ViewKindRequest::Tree(args) => {
            let repo = discover_repo(&args.repo)?;
            let commit = resolve_commit(&repo, args.commit.as_deref())?;
            let c = repo.read_commit(&commit)?;
            let root = match &args.path {
                Some(path) => match repo.resolve_path(&c.tree, path)? {
                    Some((oid, tog_object::ObjectKind::Tree)) => oid,
                    Some(_) => {
                        eprintln!("{program}: '{path}' is not a directory");
                        return Ok(1);
                    }
                    None => {
                        eprintln!("{program}: '{path}' not found in {commit}", commit = commit.to_hex());
                        return Ok(1);
                    }
                },
                None => c.tree,
            };
            ViewKind::Tree(TreeView::open(repo, colors, commit, root)?)
        }
        ViewKindRequest::Ref(args) => {
            let repo = discover_repo(&args.repo)?;
            ViewKind::Ref(RefView::open(repo)?)
        }
    };

    let screen = TermScreen::new()?;
    app::run(screen, view)
}

/// `argv[1]` matched no subcommand: spec §6 says try `log <arg>` after
/// confirming it resolves to a path in HEAD.
fn run_fallback(program: &str, arg: &str) -> anyhow::Result<i32> {
    let repo = discover_repo(&None)?;
    let Some(head) = repo.head_oid()? else {
        eprintln!("{program}: '{arg}' is no known command or path");
        return Ok(1);
    };
    let commit = repo.peel_to_commit(head)?;
    let c = repo.read_commit(&commit)?;
    if repo.resolve_path(&c.tree, arg)?.is_none() {
        eprintln!("{program}: '{arg}' is no known command or path");
        return Ok(1);
    }

    let screen = TermScreen::new()?;
    app::run(screen, ViewKind::Log(LogView::open(repo, Some(arg.to_string()), false)))
}
