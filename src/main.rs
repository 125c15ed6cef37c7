use anyhow::Context;
use clap::Parser;
use i2p_sam::config::{Cli, Commands, SamConfig};
use i2p_sam::utils::{logger, random};
use i2p_sam::{
    DestinationKeys, I2pAddr, I2pDatagramSocket, I2pStream, SamConnection, SamError, Session,
    SessionStyle, SignatureType, StreamServer,
};
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI arguments: {:?}", cli);

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration validation failed: {}", e);
            eprintln!("{}", e.user_friendly_message());
            eprintln!("Suggestion: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli.command, config).await {
        std::process::exit(report(&e));
    }
}

async fn run(command: Commands, config: SamConfig) -> anyhow::Result<()> {
    match command {
        Commands::GenDest {
            signature_type,
            output,
        } => gen_dest(&config, signature_type, output).await,
        Commands::Lookup { name } => lookup(&config, &name).await,
        Commands::Get { target, path } => get(&config, &target, &path).await,
        Commands::Serve { keys } => serve(&config, keys).await,
    }
}

/// Prints the failure and picks the exit code.
fn report(e: &anyhow::Error) -> i32 {
    tracing::error!("{:#}", e);
    match e.downcast_ref::<SamError>() {
        Some(sam) => {
            eprintln!("{}", sam.user_friendly_message());
            eprintln!("Suggestion: {}", sam.recovery_suggestion());
            if sam.is_config_error() {
                1
            } else if sam.is_recoverable() {
                2
            } else {
                3
            }
        }
        None => {
            eprintln!("{:#}", e);
            3
        }
    }
}

async fn connect(config: &SamConfig) -> anyhow::Result<SamConnection> {
    let conn =
        SamConnection::connect_timeout(config.bridge.endpoint.as_str(), config.reply_timeout())
            .await?;
    tracing::info!(
        "connected to SAM bridge {} (version {})",
        conn.sam_api(),
        conn.version()
    );
    Ok(conn)
}

async fn gen_dest(
    config: &SamConfig,
    signature_type: SignatureType,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut conn = connect(config).await?;
    let keys = conn.generate_destination(signature_type).await?;
    let address = I2pAddr::from_b64(&keys.public)?;

    match output {
        Some(path) => {
            keys.save(&path)?;
            println!("Saved {} keys to {}", keys.signature_type, path.display());
        }
        None => {
            println!("public:  {}", keys.public);
            println!("secret:  {}", keys.secret);
        }
    }
    println!("address: {}", address);
    Ok(())
}

async fn lookup(config: &SamConfig, name: &str) -> anyhow::Result<()> {
    let mut conn = connect(config).await?;
    let dest = conn.naming_lookup(name).await?;
    println!("{}", dest);
    println!("{}", I2pAddr::from_b64(&dest)?);
    Ok(())
}

async fn get(config: &SamConfig, target: &str, path: &str) -> anyhow::Result<()> {
    let (host, addr) = match target.rsplit_once(':') {
        Some((host, _)) => (host.to_string(), target.to_string()),
        None => (target.to_string(), format!("{}:80", target)),
    };

    let conn = connect(config).await?;
    let nickname = config
        .session
        .nickname
        .clone()
        .unwrap_or_else(random::nickname);
    let session = Session::create_with_connection(
        conn,
        &config.session.destination,
        &nickname,
        SessionStyle::Stream,
        &config.options,
    )
    .await?;

    let mut stream = I2pStream::connect_with_session(&session, addr.as_str()).await?;
    tracing::info!("connected to {}", stream.peer_addr());

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nUser-Agent: i2p-sam\r\nConnection: close\r\n\r\n",
        path, host
    );
    stream.write_all(request.as_bytes()).await?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    println!("{}", String::from_utf8_lossy(&response));

    session.close().await?;
    Ok(())
}

async fn serve(config: &SamConfig, keys: Option<PathBuf>) -> anyhow::Result<()> {
    let destination = match &keys {
        Some(path) => {
            DestinationKeys::load(path)
                .with_context(|| format!("loading keys from {}", path.display()))?
                .secret
        }
        None => config.session.destination.clone(),
    };

    match config.session.style {
        SessionStyle::Stream => serve_streams(config, &destination).await,
        SessionStyle::Datagram => serve_datagrams(config, &destination).await,
        style => Err(SamError::ConfigError {
            message: format!("cannot serve a {} session", style),
        }
        .into()),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn serve_streams(config: &SamConfig, destination: &str) -> anyhow::Result<()> {
    let watcher = config.session_watcher(destination).await?;

    let local_dest = watcher.session().local_dest().to_string();
    println!("Listening on {}", local_dest);
    println!("Address: {}", I2pAddr::from_b64(&local_dest)?);

    let mut server = StreamServer::new(watcher);
    let accepted = server
        .run(
            |stream: I2pStream, peer| async move {
                tracing::info!("echoing for {}", peer);
                let (mut reader, mut writer) = tokio::io::split(stream);
                tokio::io::copy(&mut reader, &mut writer).await?;
                writer.shutdown().await?;
                Ok::<(), SamError>(())
            },
            shutdown_signal(),
        )
        .await?;

    println!("Served {} streams", accepted);
    Ok(())
}

async fn serve_datagrams(config: &SamConfig, destination: &str) -> anyhow::Result<()> {
    let socket = config.datagram_socket(destination).await?;

    let local_dest = socket.session().local_dest().to_string();
    println!("Listening on {}", local_dest);
    println!("Address: {}", I2pAddr::from_b64(&local_dest)?);

    let mut echoed = 0u64;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            result = echo_datagram(&socket) => match result {
                Ok(()) => echoed += 1,
                Err(e) => tracing::warn!("datagram echo failed: {}", e),
            },
        }
    }

    socket.session().close().await?;
    println!("Echoed {} datagrams", echoed);
    Ok(())
}

async fn echo_datagram(socket: &I2pDatagramSocket) -> Result<(), SamError> {
    let mut buf = vec![0u8; 32 * 1024];
    let (n, from) = socket.recv_from(&mut buf).await?;
    tracing::info!("echoing {} bytes for {}", n, from);
    socket.send_to(&buf[..n], &from).await?;
    Ok(())
}
