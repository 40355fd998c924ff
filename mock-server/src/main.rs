use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    match std::env::var("NAME") {
        Ok(name) => {
            println!("{name} listening on {addr}");
            mock_server::run_named(listener, &name).await
        }
        Err(_) => {
            println!("mock listening on {addr}");
            mock_server::run(listener).await
        }
    }
}
