use anyhow::Context;
use dossier::{
    AppState, DossierConfig, DossierConfigManager, ResearchServices,
    api::routes,
    cli::{
        Cli, Commands,
        init::{self, InitConfig, InitResult},
        output::Output,
    },
    research::{Query, events::ProgressSink},
    types::{GenerateQueriesRequest, ReportRequest},
    utils::toml_config::{LogFormat, ServerConfig},
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let command = cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    });

    let result = match command {
        Commands::Init {
            path,
            force,
            provider,
            host,
            port,
        } => {
            let config = InitConfig {
                path,
                force,
                provider,
                host,
                port,
            };
            match init::run(config, &output) {
                InitResult::Success => Ok(()),
                InitResult::AlreadyExists => return ExitCode::from(2),
                InitResult::Error(e) => Err(anyhow::anyhow!(e)),
            }
        }
        Commands::Config { full, validate } => show_config(&cli.config, full, validate, &output),
        Commands::Serve { host, port } => serve(&cli.config, host, port, cli.verbose).await,
        Commands::Queries {
            topic,
            outline,
            num_queries,
        } => plan_queries(&cli.config, topic, outline, num_queries, cli.verbose, &output).await,
        Commands::Report {
            topic,
            outline,
            queries,
            num_queries,
            reflections,
            collection,
            no_web,
            out,
            progress,
        } => {
            let request = ReportRequest {
                topic,
                report_organization: outline,
                queries: None,
                num_queries,
                search_web: no_web.then_some(false),
                rag_collection: collection,
                reflection_count: reflections,
            };
            write_report(&cli.config, request, queries, out, progress, cli.verbose, &output).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output.error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// Install the global subscriber; `RUST_LOG` wins over the configured level
fn init_tracing(server: &ServerConfig, verbose: bool) {
    let default_level = if verbose {
        "debug".to_string()
    } else {
        server.log_level.clone()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", default_level)));

    let json = server.log_format == LogFormat::Json;
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let pretty_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(pretty_layer)
        .init();
}

async fn serve(
    config_path: &Path,
    host: Option<String>,
    port: Option<u16>,
    verbose: bool,
) -> anyhow::Result<()> {
    let mut config_manager = DossierConfigManager::new(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let config = config_manager.config();
    init_tracing(&config.server, verbose);

    if let Err(e) = config_manager.start_watching() {
        tracing::warn!(error = %e, "Config hot reload disabled");
    }
    for warning in config.validate_with_warnings()? {
        tracing::warn!(kind = ?warning.kind, "{}", warning);
    }

    let services = ResearchServices::from_config(&config).await?;
    let state = AppState {
        config_manager: std::sync::Arc::new(config_manager),
        services,
    };

    let addr = format!(
        "{}:{}",
        host.unwrap_or_else(|| config.server.host.clone()),
        port.unwrap_or(config.server.port)
    );
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(%addr, "Dossier listening");

    axum::serve(listener, routes::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

async fn load_services(config_path: &Path, verbose: bool) -> anyhow::Result<(DossierConfig, ResearchServices)> {
    let config = DossierConfig::load(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    init_tracing(&config.server, verbose);
    let services = ResearchServices::from_config(&config).await?;
    Ok((config, services))
}

async fn plan_queries(
    config_path: &Path,
    topic: String,
    outline: String,
    num_queries: Option<usize>,
    verbose: bool,
    output: &Output,
) -> anyhow::Result<()> {
    let (config, services) = load_services(config_path, verbose).await?;
    let request = GenerateQueriesRequest {
        topic,
        report_organization: outline,
        num_queries,
    };

    let queries = services
        .controller(&config)
        .generate_queries(&request, ProgressSink::disabled())
        .await?;

    if queries.is_empty() {
        output.warning("The planner returned no queries");
    }
    for (i, query) in queries.iter().enumerate() {
        output.query(i + 1, &query.section, &query.text);
    }
    Ok(())
}

async fn write_report(
    config_path: &Path,
    mut request: ReportRequest,
    queries_file: Option<PathBuf>,
    out: Option<PathBuf>,
    progress: bool,
    verbose: bool,
    output: &Output,
) -> anyhow::Result<()> {
    if let Some(path) = queries_file {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let queries: Vec<Query> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing queries from {}", path.display()))?;
        request.queries = Some(queries);
    }

    let (config, services) = load_services(config_path, verbose).await?;
    let controller = services.controller(&config);

    let (sink, mut rx) = if progress {
        let (sink, rx) = ProgressSink::channel();
        (sink, Some(rx))
    } else {
        (ProgressSink::disabled(), None)
    };

    let run = controller.run(&request, sink);
    let report = match rx.as_mut() {
        Some(rx) => {
            tokio::pin!(run);
            loop {
                tokio::select! {
                    result = &mut run => break result?,
                    Some(event) = rx.recv() => output.progress(&event.stage, &event.text),
                }
            }
        }
        None => run.await?,
    };

    match out {
        Some(path) => {
            std::fs::write(&path, &report.markdown)
                .with_context(|| format!("writing {}", path.display()))?;
            output.success(&format!(
                "Wrote {} ({} sources, {:.1}s)",
                path.display(),
                report.sources.len(),
                report.duration.as_secs_f64()
            ));
        }
        None => println!("{}", report.markdown),
    }
    Ok(())
}

fn show_config(config_path: &Path, full: bool, validate: bool, output: &Output) -> anyhow::Result<()> {
    let config = DossierConfig::load(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    output.header("Configuration");
    output.kv("file", &config_path.display().to_string());
    output.kv(
        "server",
        &format!("{}:{}", config.server.host, config.server.port),
    );
    output.kv("reasoning model", &config.research.reasoning_model);
    output.kv("writer model", &config.research.writer_model);
    output.kv("knowledge base", &config.knowledge_base.base_url);
    output.kv("web fallback", &config.research.search_web.to_string());

    output.subheader("Models");
    let mut models: Vec<_> = config.models.iter().collect();
    models.sort_by(|a, b| a.0.cmp(b.0));
    for (name, model) in models {
        output.list_item(&format!("{} -> {} ({})", name, model.model, model.provider));
    }

    if validate {
        let warnings = config.validate_with_warnings()?;
        if warnings.is_empty() {
            output.success("Configuration is valid");
        } else {
            for warning in &warnings {
                output.warning(&warning.to_string());
            }
        }
    }

    if full {
        output.subheader("Full configuration");
        println!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}
