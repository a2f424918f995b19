use backend_http::{
    EnvelopeFormat, EnvelopeHooks, FlatRequestClient, RequestDescriptor, ServiceConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env()?;
    let urls = config.base_urls();

    let main_client = FlatRequestClient::new(
        &urls.base_url,
        EnvelopeHooks::new(EnvelopeFormat::code_msg_data(config.success_code.clone())),
    );
    let outcome = main_client
        .request(RequestDescriptor::get("/auth/getUserInfo"))
        .await;
    println!("main: data={:?} error={:?}", outcome.data, outcome.error);

    for (key, base_url) in &urls.other {
        let client = FlatRequestClient::new(
            base_url,
            EnvelopeHooks::new(EnvelopeFormat::status_message_result("200")),
        );
        let outcome = client.request(RequestDescriptor::get("/")).await;
        println!("{key}: data={:?} error={:?}", outcome.data, outcome.error);
    }

    Ok(())
}
