use std::io::Write;

use anyhow::Context;
use powchain::{BlockStore, Blockchain, CancelFlag};

/// Mines and appends a block carrying `data`.
///
/// Ctrl-C while mining cancels the search; the chain is left as it was.
pub async fn run<S, W>(chain: &Blockchain<S>, data: String, out: &mut W) -> anyhow::Result<()>
where
    S: BlockStore,
    W: Write,
{
    let cancel = CancelFlag::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, cancelling mining");
                cancel.cancel();
            }
        })
    };

    let result = chain.append_with_cancel(data, cancel).await;
    interrupt.abort();

    let block = result.context("failed to add block")?;
    writeln!(out, "Success! Added block {}", block.hash())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use powchain::{InMemoryBlockStore, ProofOfWork};

    #[tokio::test]
    async fn appends_and_reports_hash() {
        let pow = ProofOfWork::new(8).expect("valid bits");
        let chain = Blockchain::open(InMemoryBlockStore::new(), pow)
            .await
            .expect("open chain");

        let mut out = Vec::new();
        run(&chain, "send 1 unit to A".to_string(), &mut out)
            .await
            .expect("addblock");

        let tip = chain.tip().expect("tip");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text, format!("Success! Added block {tip}\n"));
    }

    #[tokio::test]
    async fn failure_is_reported_not_panicked() {
        let pow = ProofOfWork::new(8).expect("valid bits");
        let chain = Blockchain::open(InMemoryBlockStore::new(), pow)
            .await
            .expect("open chain");
        chain.store().set_fail_commits(true);

        let mut out = Vec::new();
        let err = run(&chain, "x".to_string(), &mut out).await.expect_err("must fail");

        assert!(format!("{err:#}").starts_with("failed to add block"));
        assert!(out.is_empty());
        assert_eq!(chain.height().expect("height"), 1);
    }
}
