use concurrent_file_server::{Server, ServerConfig, ServerResult};
use log::info;
use std::env;
use std::sync::atomic::Ordering;

fn main() -> ServerResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Usage: concurrent-file-server [-t threads] [-l logfile] <port>
    let config = ServerConfig::from_args(env::args().skip(1))?;

    let server = Server::bind(config)?;
    info!(
        "Listening on {} with {} worker threads",
        server.local_addr()?,
        server.config().worker_threads
    );

    // SIGINT and SIGTERM stop the accept loop; workers end with the process
    let shutdown = server.shutdown_handle();
    ctrlc::set_handler(move || {
        shutdown.store(true, Ordering::Release);
    })?;

    server.run()
}
