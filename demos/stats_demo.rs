use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use clap::Parser;
use clap::ValueEnum;
use hop_set::Hop8;
use hop_set::Hop16;
use hop_set::Hop32;
use hop_set::Neighborhood;
use hop_set::NeighborhoodTable;
use hop_set::hash_table::Entry;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Width {
    Eight,
    Sixteen,
    ThirtyTwo,
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Number of values to insert; defaults to the initial capacity.
    #[arg(short = 'n', long = "values")]
    values: Option<usize>,

    #[arg(short = 'w', long = "width", value_enum, default_value_t = Width::Sixteen)]
    width: Width,

    /// Hash values through `value % modulus` first to provoke collisions.
    #[arg(short = 'm', long = "modulus")]
    modulus: Option<u64>,
}

fn hash_u64(value: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn run<N: Neighborhood>(args: &Args) {
    let hash = |value: &u64| match args.modulus {
        Some(modulus) => hash_u64(value % modulus),
        None => hash_u64(*value),
    };

    println!(
        "Creating table with H = {} and target capacity: {}",
        N::SIZE,
        args.target_capacity
    );

    let mut table: NeighborhoodTable<u64, N> =
        NeighborhoodTable::with_capacity(args.target_capacity);
    let initial_capacity = table.capacity();
    println!("Actual capacity: {initial_capacity}");

    let num_values = args.values.unwrap_or(initial_capacity);
    println!("Filling table with {num_values} u64 values...");

    let mut last_capacity = initial_capacity;
    for value in 0..num_values as u64 {
        match table.entry(hash(&value), |&v| v == value, hash) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(_) => {
                panic!("Value already exists in table: {}", value);
            }
        }

        if table.capacity() != last_capacity {
            println!(
                "  grew {} -> {} buckets at {} entries",
                last_capacity,
                table.capacity(),
                table.len()
            );
            last_capacity = table.capacity();
        }
    }

    println!("Inserted {} values into table", table.len());
    println!(
        "Final load factor: {:.2}%",
        (table.len() as f64 / table.capacity() as f64) * 100.0
    );

    table.probe_histogram().print();
}

fn main() {
    let args = Args::parse();

    match args.width {
        Width::Eight => run::<Hop8>(&args),
        Width::Sixteen => run::<Hop16>(&args),
        Width::ThirtyTwo => run::<Hop32>(&args),
    }
}
