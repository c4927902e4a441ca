#[tokio::main]
async fn main() {
    svj_voting::start_server().await;
}
