use std::env;
use std::path::Path;
use std::process::ExitCode;

use cast_card::{parse_casts_json, parse_selection, SelectionFields};
use cast_card_embedded_graphics::CardRenderer;
use cast_card_render::CardConfig;
use chrono::{DateTime, Utc};

const DEFAULT_OUT_PATH: &str = "target/cast-card/card.png";

#[derive(Clone, Debug)]
struct Args {
    casts_path: String,
    index: Option<usize>,
    selection_path: Option<String>,
    token_name: Option<String>,
    generated_at: Option<DateTime<Utc>>,
    config_path: Option<String>,
    out_path: String,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    match run(env::args().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {}", msg);
            eprintln!("{}", help_text());
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    let args = parse_args(args)?;

    let feed = std::fs::read_to_string(&args.casts_path)
        .map_err(|e| format!("failed to read '{}': {}", args.casts_path, e))?;
    let casts = parse_casts_json(&feed).map_err(|e| e.to_string())?;
    if casts.is_empty() {
        return Err(format!("'{}' contains no casts", args.casts_path));
    }

    let mut fields = match &args.selection_path {
        Some(path) => {
            let response = std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read '{}': {}", path, e))?;
            parse_selection(&response)
        }
        None => SelectionFields::default(),
    };
    if args.index.is_some() {
        fields.cast_index = args.index;
    }
    if args.token_name.is_some() {
        fields.token_name = args.token_name.clone();
    }
    let selection = fields.resolve(casts.len());

    let cfg = match &args.config_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read '{}': {}", path, e))?;
            CardConfig::from_json_str(&json).map_err(|e| e.to_string())?
        }
        None => CardConfig::default(),
    };
    let renderer = CardRenderer::new(cfg).map_err(|e| e.to_string())?;

    let cast = &casts[selection.cast_index];
    let generated_at = args.generated_at.unwrap_or_else(Utc::now);
    let (image, diagnostics) = renderer
        .render_with_diagnostics(cast, &selection.token_name, generated_at)
        .map_err(|e| e.to_string())?;

    if let Some(parent) = Path::new(&args.out_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
    }
    let (width, height) = (image.width, image.height);
    std::fs::write(&args.out_path, image.into_bytes())
        .map_err(|e| format!("failed to write '{}': {}", args.out_path, e))?;

    println!(
        "wrote {} ({}x{}, cast {} by @{}, token {}, {}/{} lines{})",
        args.out_path,
        width,
        height,
        selection.cast_index,
        cast.author.username(),
        selection.token_name,
        diagnostics.visible_lines,
        diagnostics.total_lines,
        if diagnostics.truncated {
            ", truncated"
        } else {
            ""
        }
    );
    if !selection.image_description.is_empty() {
        println!("image description: {}", selection.image_description);
    }
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<Args, String> {
    if args.len() >= 2 && (args[1] == "--help" || args[1] == "-h") {
        return Err("help requested".to_string());
    }
    let Some(casts_path) = args.get(1).filter(|v| !v.starts_with("--")) else {
        return Err("missing <casts.json> argument".to_string());
    };

    let mut cfg = Args {
        casts_path: casts_path.clone(),
        index: None,
        selection_path: None,
        token_name: None,
        generated_at: None,
        config_path: None,
        out_path: DEFAULT_OUT_PATH.to_string(),
    };

    let mut i = 2usize;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = || {
            args.get(i + 1)
                .ok_or_else(|| format!("{} requires a value", flag))
        };
        match flag {
            "--index" => {
                let v = value()?;
                cfg.index = Some(
                    v.parse::<usize>()
                        .map_err(|_| format!("invalid --index value '{}'", v))?,
                );
            }
            "--selection" => cfg.selection_path = Some(value()?.clone()),
            "--token-name" => cfg.token_name = Some(value()?.clone()),
            "--generated-at" => {
                let v = value()?;
                let parsed = DateTime::parse_from_rfc3339(v)
                    .map_err(|_| format!("invalid --generated-at value '{}'", v))?;
                cfg.generated_at = Some(parsed.with_timezone(&Utc));
            }
            "--config" => cfg.config_path = Some(value()?.clone()),
            "--out" => cfg.out_path = value()?.clone(),
            other => return Err(format!("unknown argument '{}'", other)),
        }
        i += 2;
    }
    Ok(cfg)
}

fn help_text() -> &'static str {
    "usage: render-card <casts.json> [--index N] [--selection FILE] [--token-name NAME]\n\
     \x20                  [--generated-at RFC3339] [--config FILE] [--out PATH]\n\
     \n\
     Renders one cast from a feed file into a PNG token card.\n\
     Explicit flags win over the selection file; the default output is\n\
     target/cast-card/card.png."
}
