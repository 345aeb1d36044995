use story_gen_core::model::manager;
use story_gen_core::model::story_input::{OutputFormat, StoryInput};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configure the pipeline; the values here are what a CLI or GUI
    // front-end would normally parse.
    let mut input = StoryInput::new();

    // Sources to learn from; weights equalize their influence on the
    // model independent of raw file length.
    input.add_source("./data/alice.txt");
    input.add_weighted_source("./data/grimm.txt", 2)?;

    // Model order ("accuracy"): number of lookback positions tracked.
    // 2-3 works well for songs, more for long prose.
    input.set_accuracy(3)?;

    // Generate with a coarser order than was ingested. Raising it above
    // the ingestion accuracy would be silently ignored.
    input.set_write_accuracy(2);

    // Invalid settings are rejected by the setters.
    match input.set_accuracy(0) {
        Ok(_) => println!("Should not happen"),
        Err(_) => println!("Accuracy 0 is invalid, must be >= 1"),
    }

    // Target number of generated words (punctuation is free) and the
    // paragraph-splitting policy.
    input.word_count = 200;
    input.set_target_sentences_per_paragraph(4)?;

    // Weighted mode ingests sequentially; without it, sources fan out
    // over a batched worker pool.
    input.weighted = true;

    // Emit a complete HTML document instead of plain paragraphs.
    input.output_format = OutputFormat::Html;

    // Ingest, generate, format.
    let story = manager::compose_story(&input)?;
    println!("{}", story);

    // The corpus can also be kept and persisted for later runs.
    let corpus = manager::build_corpus(&input)?;
    manager::save_corpus(&corpus, "./data/model.dat")?;
    let reloaded = manager::load_corpus("./data/model.dat", &input)?;
    println!("Reloaded dictionary with {} tokens", reloaded.len());

    Ok(())
}
