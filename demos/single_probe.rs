use rto_ping::network::{resolve_target, RawIcmpSocket};
use rto_ping::{PingConfig, Pinger, ProbeOutcome, RtoEstimator};

// Needs root or CAP_NET_RAW to open the raw socket.
#[tokio::main]
async fn main() -> rto_ping::Result<()> {
    let target = std::env::args().nth(1).unwrap_or_else(|| "8.8.8.8".to_string());
    let config = PingConfig::for_target(target);
    config.validate()?;

    let destination = resolve_target(&config.target).await?;
    let mut pinger = Pinger::with_config(RawIcmpSocket::open(destination)?, &config);
    let mut estimator = RtoEstimator::new();

    println!("Probing {} ({})", config.target, destination);
    println!("- Identifier: {:#06x}", pinger.identifier());
    println!("- Initial timeout: {:?}", estimator.rto());

    let sequence = pinger.current_sequence();
    match pinger.probe(estimator.rto()).await {
        ProbeOutcome::Measured(rtt) => {
            estimator.on_success(rtt);
            println!("\nseq {}: reply in {:?}", sequence, rtt);
        }
        ProbeOutcome::TimedOut => {
            estimator.on_timeout();
            println!("\nseq {}: no reply", sequence);
        }
        ProbeOutcome::Failed(e) => return Err(e),
    }

    println!("Next timeout: {:?}", estimator.rto());
    if let (Some(srtt), Some(rttvar)) = (estimator.srtt(), estimator.rttvar()) {
        println!("SRTT {:?}, RTTVAR {:?}", srtt, rttvar);
    }
    Ok(())
}
