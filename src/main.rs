use std::path::PathBuf;

use proteus::{handler, logger, Config, Server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional config file path as the first argument (extension optional)
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg.logging)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        tracing::info!(workers, "Using configured worker threads");
    } else {
        tracing::info!("Using default worker threads (CPU cores)");
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let files_dir = std::env::current_dir()
        .map(|dir| dir.join("Files"))
        .unwrap_or_else(|_| PathBuf::from("Files"));
    let (host, port) = (cfg.server.host.clone(), cfg.server.port);

    let mut builder = Server::builder(cfg);
    builder
        .static_files("/files", files_dir)?
        .get(
            "/user/:name",
            handler(|req, res| {
                Box::pin(async move {
                    let name = req.segments().first("name").unwrap_or("stranger");
                    let body = format!("Hello, {name}!\n");
                    res.set_header("Content-Type", "text/plain; charset=utf-8")
                        .set_header("Content-Length", body.len().to_string());
                    res.write(body.as_bytes()).await
                })
            }),
        )?;

    let server = builder.build();
    server.listen(&host, port).await?;
    Ok(())
}
