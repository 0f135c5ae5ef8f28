use std::{fs, io, path::Path, time::Duration};

pub const NET_CONNECT_TIMEOUT: Duration = Duration::from_millis(8 * 1000);

pub const NET_IO_TIMEOUT: Duration = Duration::from_millis(16 * 1000);

pub fn default_ureq_agent_builder(
    proxy_url: Option<&str>,
    timeout: Duration,
) -> ureq::config::ConfigBuilder<ureq::typestate::AgentScope> {
    let agent = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .timeout_connect(Some(NET_CONNECT_TIMEOUT))
        .timeout_recv_response(Some(NET_IO_TIMEOUT))
        .timeout_send_request(Some(NET_IO_TIMEOUT));

    // An explicit `None` keeps ureq from picking up proxies on its own.
    let proxy = proxy_url.and_then(|proxy_url| match ureq::Proxy::new(proxy_url) {
        Ok(proxy) => Some(proxy),
        Err(err) => {
            log::warn!("ignoring invalid proxy URL: {}", err);
            None
        }
    });

    agent.proxy(proxy)
}

pub fn default_ureq_agent(proxy_url: Option<&str>, timeout: Duration) -> ureq::Agent {
    default_ureq_agent_builder(proxy_url, timeout).build().into()
}

pub fn mkdir_if_not_exists(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path).or_else(|err| {
        if err.kind() == io::ErrorKind::AlreadyExists {
            Ok(())
        } else {
            Err(err)
        }
    })
}
