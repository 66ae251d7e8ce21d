//! ac: CLI binary for the action-contract checker.
//!
//! Subcommands:
//! - stats
//! - denorm
//! - norm
//! - classify
//! - controllers

use std::env;
use std::path::Path;
use std::process;

use ac_classify::{analyze_action_ranges, hint_for_values, SemanticsClassifier, SemanticsVerdict};
use ac_core::{Config, ControllerMetadata, ControllerMode, NormalizedAction, RawAction};
use ac_norm::{NormStats, Normalizer, StatisticsModel, ACTIONS};
use ac_probe::ObservationSnapshot;
use serde::Deserialize;

/// A recorded `(action, pre, post)` triple, e.g. dumped from a simulator session.
#[derive(Debug, Deserialize)]
struct ProbeFixture {
    action: RawAction,
    pre: ObservationSnapshot,
    post: ObservationSnapshot,
    #[serde(default)]
    reward: f64,
    #[serde(default)]
    done: bool,
}

fn value_of(args: &[String], i: usize, flag: &str) -> String {
    match args.get(i + 1) {
        Some(v) => v.clone(),
        None => {
            eprintln!("Missing value for {flag}");
            process::exit(1);
        }
    }
}

fn parse_vector(s: &str) -> Vec<f64> {
    s.split(',')
        .map(|t| {
            t.trim().parse::<f64>().unwrap_or_else(|_| {
                eprintln!("Invalid number in --action: {t:?}");
                process::exit(1);
            })
        })
        .collect()
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}

fn load_config(path: Option<&str>) -> Config {
    let cfg = match path {
        Some(p) => Config::load(p).unwrap_or_else(|e| {
            eprintln!("Failed to load config: {e}");
            process::exit(1);
        }),
        None => Config::default(),
    };
    cfg.validate().unwrap_or_else(|e| {
        eprintln!("Invalid config: {e}");
        process::exit(1);
    });
    cfg
}

fn controller_metadata(cfg: &Config) -> ControllerMetadata {
    cfg.controller.metadata().unwrap_or_else(|e| {
        eprintln!("Invalid controller config: {e}");
        process::exit(1);
    })
}

fn load_signal(stats_path: &str, key: &str, cfg: &Config) -> StatisticsModel {
    let stats = NormStats::load(stats_path, cfg.normalization.std_tolerance).unwrap_or_else(|e| {
        eprintln!("Failed to load statistics: {e}");
        process::exit(1);
    });
    match stats.signal(key) {
        Ok(model) => model.clone(),
        Err(e) => {
            let known: Vec<&str> = stats.names().collect();
            eprintln!("{e} (available: {})", known.join(", "));
            process::exit(1);
        }
    }
}

fn build_normalizer(stats: StatisticsModel, cfg: &Config) -> Normalizer {
    Normalizer::from_config(stats, &cfg.normalization).unwrap_or_else(|e| {
        eprintln!("Invalid statistics for this config: {e}");
        process::exit(1);
    })
}

fn describe_controller(meta: &ControllerMetadata) -> String {
    let mode = meta.mode.map(|m| m.name()).unwrap_or("undeclared");
    let kind = if meta.control_delta { "delta" } else { "absolute" };
    format!("{mode}, {kind}, d={}", meta.action_dim)
}

fn print_help() {
    eprintln!(
        r#"ac - action-contract checker

USAGE:
    ac <COMMAND> [OPTIONS]

COMMANDS:
    stats           Print normalization statistics and a range analysis
    denorm          Denormalize a policy output into a raw action
    norm            Normalize a raw action into model space
    classify        Classify a recorded (action, pre, post) probe
    controllers     List the controller presets

OPTIONS:
    -h, --help          Print this help message
    -V, --version       Print version

Run `ac <COMMAND> --help` for command options.
"#
    );
}

fn print_version() {
    println!("ac {}", env!("CARGO_PKG_VERSION"));
}

fn cmd_stats(args: &[String]) {
    let mut stats_path: Option<String> = None;
    let mut key = ACTIONS.to_string();
    let mut config_path: Option<String> = None;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!(
                    r#"ac stats

USAGE:
    ac stats --stats norm_stats.json [--key actions] [--config cfg.yaml]

OPTIONS:
    --stats PATH     Statistics JSON (wrapped {{"norm_stats": ...}} or bare map) (required)
    --key NAME       Signal to print (default: actions)
    --config PATH    YAML config (default: built-in defaults)
"#
                );
                return;
            }
            "--stats" => {
                stats_path = Some(value_of(args, i, "--stats"));
                i += 2;
            }
            "--key" => {
                key = value_of(args, i, "--key");
                i += 2;
            }
            "--config" => {
                config_path = Some(value_of(args, i, "--config"));
                i += 2;
            }
            other => {
                eprintln!("Unknown option for `ac stats`: {}", other);
                eprintln!("Run `ac stats --help` for usage.");
                process::exit(1);
            }
        }
    }

    let stats_path = stats_path.unwrap_or_else(|| {
        eprintln!("Missing --stats");
        process::exit(1);
    });
    let cfg = load_config(config_path.as_deref());
    let model = load_signal(&stats_path, &key, &cfg);

    println!("Signal: {} ({} dims)", model.name(), model.dimension_count());
    println!("  {:>3} {:>12} {:>12} {:>12} {:>12}", "dim", "mean", "std", "q01", "q99");
    for d in 0..model.dimension_count() {
        println!(
            "  {:>3} {:>12.6} {:>12.6} {:>12.6} {:>12.6}",
            d,
            model.mean()[d],
            model.std()[d],
            model.q01()[d],
            model.q99()[d]
        );
    }

    let meta = controller_metadata(&cfg);
    println!();
    match analyze_action_ranges(&model, &meta, &cfg.classifier.workspace) {
        Ok(report) => {
            println!("Range analysis ({}):", describe_controller(&meta));
            for d in &report.dims {
                println!("  dim {}: [{:.4}, {:.4}] -> {}", d.index, d.q01, d.q99, d.hint);
            }
            println!("  position hint: {}", report.position_hint);
        }
        Err(e) => println!("Range analysis skipped: {e}"),
    }
}

/// Shared option parsing for `denorm` and `norm`.
struct TransformArgs {
    stats_path: String,
    key: String,
    config_path: Option<String>,
    action: Vec<f64>,
    json: bool,
}

fn parse_transform_args(cmd: &str, args: &[String]) -> Option<TransformArgs> {
    let mut stats_path: Option<String> = None;
    let mut key = ACTIONS.to_string();
    let mut config_path: Option<String> = None;
    let mut action: Option<Vec<f64>> = None;
    let mut json = false;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!(
                    r#"ac {cmd}

USAGE:
    ac {cmd} --stats norm_stats.json --action V,V,... [--key actions] [--config cfg.yaml] [--json]

OPTIONS:
    --stats PATH     Statistics JSON (required)
    --action LIST    Comma-separated action values (required)
    --key NAME       Signal whose statistics to use (default: actions)
    --config PATH    YAML config (default: built-in defaults)
    --json           Print the result as a JSON array
"#
                );
                return None;
            }
            "--stats" => {
                stats_path = Some(value_of(args, i, "--stats"));
                i += 2;
            }
            "--key" => {
                key = value_of(args, i, "--key");
                i += 2;
            }
            "--config" => {
                config_path = Some(value_of(args, i, "--config"));
                i += 2;
            }
            "--action" => {
                action = Some(parse_vector(&value_of(args, i, "--action")));
                i += 2;
            }
            "--json" => {
                json = true;
                i += 1;
            }
            other => {
                eprintln!("Unknown option for `ac {cmd}`: {}", other);
                eprintln!("Run `ac {cmd} --help` for usage.");
                process::exit(1);
            }
        }
    }

    let stats_path = stats_path.unwrap_or_else(|| {
        eprintln!("Missing --stats");
        process::exit(1);
    });
    let action = action.unwrap_or_else(|| {
        eprintln!("Missing --action");
        process::exit(1);
    });
    Some(TransformArgs {
        stats_path,
        key,
        config_path,
        action,
        json,
    })
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => {
            eprintln!("Failed to serialize output: {e}");
            process::exit(1);
        }
    }
}

fn cmd_denorm(args: &[String]) {
    let Some(a) = parse_transform_args("denorm", args) else {
        return;
    };
    let cfg = load_config(a.config_path.as_deref());
    let normalizer = build_normalizer(load_signal(&a.stats_path, &a.key, &cfg), &cfg);
    let normalized = NormalizedAction::new(a.action);
    let raw = normalizer.denormalize(&normalized).unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    if a.json {
        print_json(&raw);
        return;
    }

    println!("Normalized: {}", fmt_vec(normalized.as_slice()));
    println!("Raw:        {}", fmt_vec(raw.as_slice()));

    let meta = controller_metadata(&cfg);
    match meta.layout().and_then(|l| raw.split(l)) {
        Some(parts) => {
            println!("Layout ({}):", describe_controller(&meta));
            if let Some(p) = parts.position {
                println!("  position: {}", fmt_vec(p));
            }
            if let Some(r) = parts.rotation {
                println!("  rotation: {}", fmt_vec(r));
            }
            if let Some(j) = parts.joints {
                println!("  joints:   {}", fmt_vec(j));
            }
            println!("  gripper:  {:.6}", parts.gripper);
        }
        None => println!("Layout: no split for d={} under {}", raw.len(), describe_controller(&meta)),
    }
    if let Some(hint) = hint_for_values(raw.as_slice(), &meta, &cfg.classifier.workspace) {
        println!("Range hint: {hint}");
    }
}

fn cmd_norm(args: &[String]) {
    let Some(a) = parse_transform_args("norm", args) else {
        return;
    };
    let cfg = load_config(a.config_path.as_deref());
    let normalizer = build_normalizer(load_signal(&a.stats_path, &a.key, &cfg), &cfg);
    let raw = RawAction::new(a.action);
    let normalized = normalizer.normalize(&raw).unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    if a.json {
        print_json(&normalized);
    } else {
        println!("Raw:        {}", fmt_vec(raw.as_slice()));
        println!("Normalized: {}", fmt_vec(normalized.as_slice()));
    }
}

fn verdict_event(run_id: &str, meta: &ControllerMetadata, v: &SemanticsVerdict) -> ac_logging::VerdictEventV1 {
    let e = &v.evidence;
    ac_logging::VerdictEventV1 {
        event: "verdict",
        ts_ms: ac_logging::now_ms(),
        v: ac_logging::VersionInfoV1::current(),
        run_id: run_id.to_string(),
        controller_mode: meta.mode.map(|m| m.name().to_string()),
        action_dim: meta.action_dim,
        control_delta: meta.control_delta,
        verdict: v.verdict.to_string(),
        detected: v.detected.map(|d| d.verdict().to_string()),
        reason: v.inconclusive.as_ref().map(|r| r.to_string()),
        commanded_magnitude: e.commanded_magnitude,
        observed_magnitude: e.observed_magnitude,
        ratio: e.ratio,
        within_workspace: e.within_workspace,
        sign_agreement: e.sign_agreement,
    }
}

/// Statistics passed to `ac classify`, recorded in the event log and the manifest.
struct ClassifyStats {
    path: String,
    key: String,
    normalizer: Normalizer,
}

fn probe_event(run_id: &str, fx: &ProbeFixture, normalized: Option<&NormalizedAction>) -> ac_logging::ProbeEventV1 {
    let pre = *fx.pre.eef_pos();
    let post = *fx.post.eef_pos();
    let joint_pos_delta = if fx.pre.joint_pos().len() == fx.post.joint_pos().len() {
        fx.post
            .joint_pos()
            .iter()
            .zip(fx.pre.joint_pos())
            .map(|(a, b)| a - b)
            .collect()
    } else {
        Vec::new()
    };
    ac_logging::ProbeEventV1 {
        event: "probe",
        ts_ms: ac_logging::now_ms(),
        v: ac_logging::VersionInfoV1::current(),
        run_id: run_id.to_string(),
        normalized_action: normalized.map(|n| n.as_slice().to_vec()),
        raw_action: fx.action.as_slice().to_vec(),
        pre_eef_pos: pre,
        post_eef_pos: post,
        eef_pos_delta: [post[0] - pre[0], post[1] - pre[1], post[2] - pre[2]],
        joint_pos_delta,
        reward: fx.reward,
        done: fx.done,
    }
}

fn append_events(
    path: &Path,
    probe: &ac_logging::ProbeEventV1,
    verdict: &ac_logging::VerdictEventV1,
) -> Result<(), ac_logging::NdjsonError> {
    let mut w = ac_logging::NdjsonWriter::open_append(path)?;
    w.write_event(probe)?;
    w.write_event(verdict)?;
    w.flush()
}

fn update_manifest(
    path: &Path,
    run_id: &str,
    config_path: Option<&str>,
    stats: Option<&ClassifyStats>,
    meta: &ControllerMetadata,
    v: &SemanticsVerdict,
) {
    let hash_file = |p: &str| std::fs::read(p).ok().map(|b| ac_logging::hash_config_bytes(&b));
    let config_hash = config_path.and_then(hash_file);
    let mut manifest = ac_logging::RunManifestV1 {
        run_manifest_version: ac_logging::RUN_MANIFEST_VERSION,
        run_id: run_id.to_string(),
        created_ts_ms: ac_logging::now_ms(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: ac_logging::try_git_hash(),
        config_hash,
        stats_hash: stats.and_then(|s| hash_file(&s.path)),
        stats_path: stats.map(|s| s.path.clone()),
        signal: stats.map(|s| s.key.clone()),
        controller_mode: meta.mode.map(|m| m.name().to_string()),
        action_dim: meta.action_dim,
        control_delta: meta.control_delta,
        checks_completed: 0,
        inconsistent: 0,
        last_verdict: None,
        last_verdict_ts_ms: None,
    };
    // An existing manifest keeps its identity and counters.
    if let Ok(existing) = ac_logging::read_manifest(path) {
        manifest.created_ts_ms = existing.created_ts_ms;
        manifest.run_id = existing.run_id;
        manifest.checks_completed = existing.checks_completed;
        manifest.inconsistent = existing.inconsistent;
    }
    manifest.checks_completed += 1;
    if !v.is_consistent() {
        manifest.inconsistent += 1;
    }
    manifest.last_verdict = Some(v.verdict.to_string());
    manifest.last_verdict_ts_ms = Some(ac_logging::now_ms());
    ac_logging::write_manifest_atomic(path, &manifest).unwrap_or_else(|e| {
        eprintln!("Failed to write run manifest: {e}");
        process::exit(1);
    });
}

fn cmd_classify(args: &[String]) {
    let mut fixture_path: Option<String> = None;
    let mut config_path: Option<String> = None;
    let mut stats_path: Option<String> = None;
    let mut key = ACTIONS.to_string();
    let mut log_path: Option<String> = None;
    let mut manifest_path: Option<String> = None;
    let mut json = false;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!(
                    r#"ac classify

USAGE:
    ac classify --fixture probe.json [--config cfg.yaml] [--stats norm_stats.json [--key actions]]
                [--log events.ndjson] [--manifest run.json] [--json]

OPTIONS:
    --fixture PATH    JSON with "action", "pre" and "post" (required)
    --config PATH     YAML config (default: built-in defaults)
    --stats PATH      Statistics the action was denormalized with; logs its model-space form
    --key NAME        Signal inside --stats (default: actions)
    --log PATH        Append probe + verdict events as NDJSON
    --manifest PATH   Create or update a run manifest
    --json            Print the verdict as JSON
"#
                );
                return;
            }
            "--fixture" => {
                fixture_path = Some(value_of(args, i, "--fixture"));
                i += 2;
            }
            "--config" => {
                config_path = Some(value_of(args, i, "--config"));
                i += 2;
            }
            "--stats" => {
                stats_path = Some(value_of(args, i, "--stats"));
                i += 2;
            }
            "--key" => {
                key = value_of(args, i, "--key");
                i += 2;
            }
            "--log" => {
                log_path = Some(value_of(args, i, "--log"));
                i += 2;
            }
            "--manifest" => {
                manifest_path = Some(value_of(args, i, "--manifest"));
                i += 2;
            }
            "--json" => {
                json = true;
                i += 1;
            }
            other => {
                eprintln!("Unknown option for `ac classify`: {}", other);
                eprintln!("Run `ac classify --help` for usage.");
                process::exit(1);
            }
        }
    }

    let fixture_path = fixture_path.unwrap_or_else(|| {
        eprintln!("Missing --fixture");
        process::exit(1);
    });
    let cfg = load_config(config_path.as_deref());
    let meta = controller_metadata(&cfg);

    let bytes = std::fs::read(&fixture_path).unwrap_or_else(|e| {
        eprintln!("Failed to read fixture: {e}");
        process::exit(1);
    });
    let fx: ProbeFixture = serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        eprintln!("Failed to parse fixture: {e}");
        process::exit(1);
    });

    let stats = stats_path.map(|path| {
        let normalizer = build_normalizer(load_signal(&path, &key, &cfg), &cfg);
        ClassifyStats { path, key, normalizer }
    });
    let normalized = stats.as_ref().map(|s| {
        s.normalizer.normalize(&fx.action).unwrap_or_else(|e| {
            eprintln!("Failed to normalize fixture action: {e}");
            process::exit(1);
        })
    });

    let classifier = SemanticsClassifier::new(cfg.classifier.clone());
    let verdict = classifier
        .classify(&meta, &fx.action, &fx.pre, &fx.post)
        .unwrap_or_else(|e| {
            eprintln!("Classification failed: {e}");
            process::exit(1);
        });

    let run_id = Path::new(&fixture_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("probe")
        .to_string();

    if let Some(log_path) = &log_path {
        let probe_ev = probe_event(&run_id, &fx, normalized.as_ref());
        let verdict_ev = verdict_event(&run_id, &meta, &verdict);
        append_events(Path::new(log_path), &probe_ev, &verdict_ev).unwrap_or_else(|e| {
            eprintln!("Failed to write event log: {e}");
            process::exit(1);
        });
    }
    if let Some(manifest_path) = &manifest_path {
        update_manifest(
            Path::new(manifest_path),
            &run_id,
            config_path.as_deref(),
            stats.as_ref(),
            &meta,
            &verdict,
        );
    }

    if json {
        print_json(&verdict);
    } else {
        println!("Controller: {}", describe_controller(&meta));
        println!("Verdict:    {}", verdict.summary());
    }
}

fn cmd_controllers() {
    println!("Controller presets:");
    for mode in ControllerMode::ALL {
        let meta = ControllerMetadata::preset(mode);
        println!(
            "  {:<15} d={}  layout={:?}  output_max={}",
            mode.name(),
            meta.action_dim,
            mode.layout(),
            fmt_vec(meta.output_max.as_deref().unwrap_or(&[]))
        );
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        process::exit(1);
    }

    match args[1].as_str() {
        "-h" | "--help" | "help" => {
            print_help();
        }
        "-V" | "--version" => {
            print_version();
        }
        "stats" => {
            cmd_stats(&args[2..]);
        }
        "denorm" => {
            cmd_denorm(&args[2..]);
        }
        "norm" => {
            cmd_norm(&args[2..]);
        }
        "classify" => {
            cmd_classify(&args[2..]);
        }
        "controllers" => {
            cmd_controllers();
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            eprintln!("Run `ac --help` for usage.");
            process::exit(1);
        }
    }
}
