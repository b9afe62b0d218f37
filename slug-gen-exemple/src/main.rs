use serde_json::json;
use slug_gen_core::{Config, FixedSource, Generator, Root, SharedSource, StdRngSource};

fn main() -> anyhow::Result<()> {
    // Set RUST_LOG=debug to see how the tree is built and squashed
    env_logger::init();

    // A configuration is a map of rules. 'all' is the default root
    let config = Config::from_json_value(json!({
        "all": {
            "type": "nested",
            "lists": ["2", "3"],
            "ensure_unique": true,
            "max_slug_length": 30
        },
        // All-digit rules are auxiliary roots: "exactly n words"
        "2": {"type": "cartesian", "lists": ["adjective", "animal"]},
        "3": {"type": "cartesian", "lists": ["adjective", "adjective", "animal"]},
        "adjective": {"type": "nested", "lists": ["color", "mood"]},
        "color": {"type": "words", "words": ["amber", "crimson", "teal", "ivory"]},
        "mood": {"type": "words", "words": ["calm", "brave", "sleepy"], "max_length": 8},
        "animal": {"type": "phrases", "phrases": ["fox", "sea otter", ["snow", "owl"]]},
        // Any rule marked as a generator is a root too
        "cyrillic": {"generator": true, "type": "cartesian", "lists": ["color_ru", "animal_ru"]},
        "color_ru": {"type": "words", "words": ["белая", "чёрная"]},
        "animal_ru": {"type": "words", "words": ["кошка", "собака"]}
    }))?;

    // Seeded source: the same seed always gives the same slugs
    let mut generator = Generator::with_source(config, SharedSource::new(StdRngSource::from_seed(2024)))?;

    // Number of combinations for each root
    for name in generator.root_names() {
        let root = Root::parse(&name);
        println!("{}: {} combinations", root, generator.combination_count(&root)?);
    }

    // Generate 10 slugs from the default root
    for i in 0..10 {
        println!("Generated slug {}: {}", i + 1, generator.generate_slug(&Root::Default)?);
    }

    // Auxiliary roots are built on first use
    println!("Two words: {}", generator.generate_slug(&Root::Words(2))?);
    println!("Three words: {:?}", generator.generate(&Root::Words(3))?);
    println!("Cyrillic: {}", generator.generate_slug(&Root::from("cyrillic"))?);

    // Asking for a root that does not exist
    match generator.generate_slug(&Root::Words(7)) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("{e}"),
    }

    // A fixed source replays indices: index 0 is the first combination
    generator.set_source(SharedSource::new(FixedSource::new([0])));
    println!("First combination of '2': {}", generator.generate_slug(&Root::Words(2))?);

    // Tree after squashing: 'adjective' is merged into a single word list
    print!("{}", generator.dump(&Root::Default)?);

    // A constraint that no combination can satisfy is refused at construction
    let impossible = Config::from_json_value(json!({
        "all": {"type": "cartesian", "lists": ["long", "long"], "max_slug_length": 10},
        "long": {"type": "words", "words": ["extraordinary", "magnificent"]}
    }))?;
    match Generator::new(impossible) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("{e}"),
    }

    Ok(())
}
