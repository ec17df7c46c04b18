use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

#[allow(dead_code)]
#[path = "../src/comments/tree.rs"]
mod tree;

use tree::{CommentRecord, build_tree};

#[derive(Clone)]
struct Row {
    id: i32,
    parent_id: Option<i32>,
    author: String,
    content: String,
}

impl CommentRecord for Row {
    type Id = i32;
    type Viewer = i32;
    type Output = (i32, String, bool);

    fn comment_id(&self) -> i32 {
        self.id
    }

    fn parent_id(&self) -> Option<i32> {
        self.parent_id
    }

    fn has_parent(&self) -> bool {
        self.parent_id.is_some()
    }

    fn serialize(&self, viewer: Option<&i32>) -> Self::Output {
        let owner = viewer.is_some_and(|v| self.author == format!("user{v}"));
        (self.id, self.content.clone(), owner)
    }
}

// Every comment replies to one created earlier, `fanout` controls how bushy
// the threads get. Deterministic so runs stay comparable.
fn generate_rows(n: usize, fanout: usize) -> Vec<Row> {
    (0..n)
        .map(|i| {
            let parent_id = match i {
                0 => None,
                i if i % (fanout + 1) == 0 => None,
                i => Some(((i - 1) / fanout) as i32),
            };

            Row {
                id: i as i32,
                parent_id,
                author: format!("user{}", i % 17),
                content: format!("comment number {i}"),
            }
        })
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("comment_tree");
    for (n, fanout) in [(10, 2), (100, 3), (1000, 5), (10000, 10), (100000, 30)] {
        let rows = generate_rows(n, fanout);
        group.bench_function(BenchmarkId::new("anonymous", n), |b| {
            b.iter(|| build_tree(&rows, None))
        });
        group.bench_function(BenchmarkId::new("with_viewer", n), |b| {
            b.iter(|| build_tree(&rows, Some(&3)))
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
