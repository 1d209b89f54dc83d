//! Write a 3-D field, then load it back with four workers on a 2x2 grid

use std::sync::Arc;
use std::time::Instant;

use pario::{npy, LocalArray, ProcessGroup, ThreadComm};

fn main() -> pario::Result<()> {
    let filename = "example_field.npy";
    let shape = [64, 32, 16];

    println!("Writing {shape:?} field to '{filename}'...");
    let values: Vec<f32> = (0..shape.iter().product::<usize>()).map(|i| i as f32).collect();
    npy::save(filename, &LocalArray::whole(values, &shape)?)?;

    let start = Instant::now();
    let bricks = ThreadComm::run(4, |comm| -> pario::Result<LocalArray<f32>> {
        let group = ProcessGroup::cartesian(Arc::new(comm), 2)?;
        npy::load::<f32>(filename, &group)
    })?;
    println!("Loaded in {:.3}ms", start.elapsed().as_secs_f64() * 1000.0);

    for (rank, brick) in bricks.into_iter().enumerate() {
        let brick = brick?;
        // First element of a brick is its global flat index
        let first = brick.data().first().copied().unwrap_or_default();
        println!(
            "   rank {rank}: starts {:?}, shape {:?}, first value {first}",
            brick.starts(),
            brick.shape()
        );
    }

    std::fs::remove_file(filename).ok();
    Ok(())
}
