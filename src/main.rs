#[actix_web::main]
async fn main() -> std::io::Result<()> {
    docprint_server::run().await
}
