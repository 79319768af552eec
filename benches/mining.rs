use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use retail_analytics::basket::{BasketConfig, BasketMiner};
use retail_analytics::data::{CustomerId, Transaction, TransactionTable};
use retail_analytics::pipeline::{Pipeline, PipelineConfig};

fn create_transactions(n_invoices: usize, n_items: usize, n_customers: usize) -> TransactionTable {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let start = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();

    let mut rows = Vec::with_capacity(n_invoices * 4);
    for inv in 0..n_invoices {
        // spread invoices over two years
        let ts = start + Duration::minutes((inv as i64 * 730 * 24 * 60) / n_invoices as i64);
        let customer = CustomerId::new(format!("{}", 12000 + rng.gen_range(0..n_customers)));
        let basket_size = rng.gen_range(1..=6);
        for _ in 0..basket_size {
            // skewed item popularity so that some pairs are frequent
            let item = (rng.gen::<f64>().powi(3) * n_items as f64) as usize;
            rows.push(Transaction {
                invoice_no: format!("{}", 500000 + inv),
                stock_code: format!("{:05}", item),
                description: format!("PRODUCT {}", item),
                quantity: rng.gen_range(1..24),
                unit_price: 0.5 + rng.gen::<f64>() * 10.0,
                invoice_date: ts,
                customer_id: customer.clone(),
                country: "United Kingdom".to_string(),
            });
        }
    }
    TransactionTable::new(rows).unwrap()
}

fn bench_apriori(c: &mut Criterion) {
    let mut group = c.benchmark_group("apriori");
    group.sample_size(10);

    for n_invoices in [1000, 5000, 20000].iter() {
        let table = create_transactions(*n_invoices, 500, 1000);

        group.bench_with_input(BenchmarkId::new("mine", n_invoices), &table, |b, table| {
            b.iter(|| {
                let miner = BasketMiner::new(BasketConfig::default().with_min_support(0.01));
                miner.mine(black_box(table)).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);

    for n_invoices in [2000, 10000].iter() {
        let table = create_transactions(*n_invoices, 500, 2000);
        let pipeline = Pipeline::new(PipelineConfig::default());

        group.bench_with_input(BenchmarkId::new("run", n_invoices), &table, |b, table| {
            b.iter(|| pipeline.run(black_box(table)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_apriori, bench_pipeline);
criterion_main!(benches);
