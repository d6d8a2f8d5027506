// TCP server

use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::log::Logger;
use crate::session::handle_session_connection;
use crate::store::StreamStore;

use super::{AppResolver, RtmpServerConfiguration, SessionIdGenerator};

/// Runs the TCP listener, spawning one session per accepted
/// connection
pub async fn run_server(
    logger: Arc<Logger>,
    config: Arc<RtmpServerConfiguration>,
    store: Arc<StreamStore>,
    resolver: Arc<AppResolver>,
) {
    let listen_addr = config.get_tcp_listen_addr();

    let listener = match TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            logger.log_error(&format!("Could not create TCP listener: {}", e));
            return;
        }
    };

    logger.log_info(&format!("Listening on {}", listen_addr));

    let session_id_generator = Arc::new(Mutex::new(SessionIdGenerator::new()));

    loop {
        let (connection, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                logger.log_error(&format!("Could not accept connection: {}", e));
                return;
            }
        };

        let session_id = session_id_generator.lock().await.generate_id();

        if config.log_requests {
            logger.log_info(&format!(
                "Connection accepted from {} (session: {})",
                addr.ip(),
                session_id
            ));
        }

        handle_connection_tcp(
            connection,
            session_id,
            logger.clone(),
            config.clone(),
            store.clone(),
            resolver.clone(),
        );
    }
}

fn handle_connection_tcp(
    connection: TcpStream,
    session_id: u64,
    logger: Arc<Logger>,
    config: Arc<RtmpServerConfiguration>,
    store: Arc<StreamStore>,
    resolver: Arc<AppResolver>,
) {
    tokio::spawn(async move {
        let _ = connection.set_nodelay(true);

        let session_logger =
            Arc::new(logger.make_child_logger(&format!("[SESSION {}] ", session_id)));

        let (read_stream, write_stream) = tokio::io::split(connection);

        handle_session_connection(
            session_logger.clone(),
            config.clone(),
            store,
            resolver,
            session_id,
            read_stream,
            write_stream,
        )
        .await;

        if config.log_requests {
            session_logger.log_info("Connection closed");
        }
    });
}
