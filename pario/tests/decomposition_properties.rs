use pario::{
    partition_sizes, split_work, ByteRun, CartesianTopology, Decomposer, ElementType,
    LinearTopology, Order, ParioError, Subarray, Topology,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn test_split_is_contiguous_balanced_and_monotonic() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..500 {
        let workers = rng.gen_range(1..=64);
        let load = rng.gen_range(workers..=workers * 9 + 7);

        let mut next = 0;
        let mut previous = 0;
        for id in 0..workers {
            let range = split_work(load, workers, id).unwrap();
            assert_eq!(range.start, next, "gap or overlap at id {id}");
            assert!(range.len() >= previous, "share shrank at id {id}");
            next = range.end;
            previous = range.len();
        }
        assert_eq!(next, load);

        let sizes = partition_sizes(load, workers).unwrap();
        let (min, max) = (sizes.iter().min().unwrap(), sizes.iter().max().unwrap());
        assert!(max - min <= 1);
        assert_eq!(sizes.iter().sum::<usize>(), load);
    }
}

#[test]
fn test_load_below_workers_always_fails() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..200 {
        let workers = rng.gen_range(2..=64);
        let load = rng.gen_range(0..workers);
        let id = rng.gen_range(0..workers);
        assert_eq!(
            split_work(load, workers, id),
            Err(ParioError::LoadBelowWorkers { load, workers })
        );
    }
    assert!(split_work(3, 5, 0).is_err());
}

/// Byte runs of all ranks, sorted, must abut and span the payload
fn assert_runs_partition_payload(topologies: Vec<Topology>, domain: &[usize], element: ElementType) {
    let mut runs: Vec<ByteRun> = Vec::new();
    let mut global = 0;
    for topology in &topologies {
        let decomposition = Decomposer::for_topology(topology)
            .unwrap()
            .decompose(domain)
            .unwrap();
        let region = Subarray::new(decomposition, element, Order::C).unwrap().commit();
        global = region.global_bytes();
        runs.extend_from_slice(region.runs());
    }
    runs.sort_by_key(|r| r.offset);

    let mut next = 0;
    for run in &runs {
        assert_eq!(run.offset, next);
        next = run.end();
    }
    assert_eq!(next, global);
}

#[test]
fn test_random_grids_partition_payload() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..100 {
        let ndims = rng.gen_range(1..=3);
        let workers = rng.gen_range(1..=12);
        let grid = pario::dims_create(workers, ndims).unwrap();

        // Every decomposed axis holds at least as many units as grid workers
        let rank = rng.gen_range(ndims..=4);
        let domain: Vec<usize> = (0..rank)
            .map(|axis| grid.get(axis).copied().unwrap_or(1) + rng.gen_range(0..6))
            .collect();

        let topologies: Vec<Topology> = (0..workers)
            .map(|r| CartesianTopology::new(workers, r, ndims).unwrap().into())
            .collect();
        assert_runs_partition_payload(topologies, &domain, ElementType::F32);
    }
}

#[test]
fn test_slab_runs_partition_payload() {
    let topologies: Vec<Topology> = (0..5)
        .map(|r| LinearTopology::new(5, r).unwrap().into())
        .collect();
    assert_runs_partition_payload(topologies, &[13, 3, 2], ElementType::U16);
}
