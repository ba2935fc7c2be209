//! Train the two-layer GCN on Zachary's karate club.
//!
//! Run with: `cargo run --example karate_club`
//! (`RUST_LOG=debug` also shows model and evaluation events.)

use anyhow::Result;
use candle_core::Device;
use lattix_gcn::{datasets, NodeDataset, Trainer, TrainingConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .without_time()
        .with_target(false)
        .init();

    let device = Device::Cpu;
    let (graph, labels) = datasets::karate_club()?;
    println!("Karate club: {} members, {} friendships", graph.num_nodes(), graph.num_edges());

    let data = NodeDataset::from_graph(&graph, labels, &device)?;
    let mut trainer = Trainer::new(TrainingConfig::default(), data.num_features(), &device)?;
    let report = trainer.fit(&data)?;

    let eval = &report.evaluation;
    println!("\nEvaluation: loss {:.4}, accuracy {:.4}", eval.loss, eval.accuracy);
    println!("Member | Club | Predicted");
    println!("-------|------|----------");
    for (member, (&club, &predicted)) in data
        .label_ids()
        .iter()
        .zip(&eval.predictions)
        .enumerate()
    {
        let mark = if club == predicted { "" } else { "  <- misclassified" };
        println!("{member:6} | {club:4} | {predicted:9}{mark}");
    }

    Ok(())
}
