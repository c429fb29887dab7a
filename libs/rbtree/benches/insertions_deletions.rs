use criterion::{Criterion, criterion_group, criterion_main};
use rand::prelude::SliceRandom;
use rbtree::{Entry, RbTree};

#[derive(Debug)]
struct BenchEntry {
    value: usize,
}

impl Entry for BenchEntry {
    type Key = usize;
    type Aggregate = ();

    fn key(&self) -> &usize {
        &self.value
    }

    fn aggregate(&self, _left: Option<()>, _right: Option<()>) {}
}

fn inserts_then_deletes(inserts: &[usize], deletes: &[usize]) {
    let mut tree: RbTree<BenchEntry> = RbTree::new();

    for i in inserts {
        tree.insert(BenchEntry { value: *i });
    }

    for i in deletes {
        let id = tree.find(i).unwrap();
        tree.remove(id);
    }
}

fn bench_inserts_deletes(c: &mut Criterion) {
    let mut rng = rand::rng();

    let mut inserts = (0..700).collect::<Vec<_>>();
    inserts.shuffle(&mut rng);
    let mut deletes = inserts.clone();
    deletes.shuffle(&mut rng);

    c.bench_function("inserts_deletes 700", |b| {
        b.iter(|| inserts_then_deletes(&inserts, &deletes));
    });
}

criterion_group!(benches, bench_inserts_deletes);
criterion_main!(benches);
