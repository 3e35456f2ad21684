// Shared fixtures: tiny corpora and in-memory models for integration tests.

#![allow(dead_code)]

use std::path::Path;

use quill::corpus::LabeledExample;
use quill::models::doc2vec::{Doc2Vec, Doc2VecParams, TaggedDocument};
use quill::models::lda::{Dictionary, LdaModel, TopicModel};
use quill::text::normalize;

/// Positives all mention "wonderful"; negatives never do.
pub fn sentiment_examples() -> Vec<LabeledExample> {
    let positive = [
        "A wonderful film with superb acting",
        "Wonderful story and charming characters",
        "The soundtrack was wonderful and moving",
        "Wonderful direction, brilliant cast",
        "Truly wonderful, delightful and touching",
        "Wonderful pacing and gorgeous scenery",
        "Such a wonderful and uplifting film",
        "Wonderful script with clever dialogue",
        "A wonderful, heartfelt performance",
        "Wonderful visuals and a lovely score",
    ];
    let negative = [
        "A terrible film with awful acting",
        "Boring story and flat characters",
        "The soundtrack was dull and grating",
        "Clumsy direction, wasted cast",
        "Truly dreadful, tedious and lifeless",
        "Sluggish pacing and ugly scenery",
        "Such a bleak and tiresome film",
        "Lazy script with clunky dialogue",
        "A wooden, forgettable performance",
        "Murky visuals and a grating score",
    ];
    positive
        .iter()
        .map(|t| LabeledExample::new(*t, "positive"))
        .chain(negative.iter().map(|t| LabeledExample::new(*t, "negative")))
        .collect()
}

pub fn write_sentiment_csv(path: &Path) {
    let mut body = String::from("review,sentiment\n");
    for ex in sentiment_examples() {
        body.push_str(&format!("\"{}\",{}\n", ex.text.replace('"', "\"\""), ex.label));
    }
    std::fs::write(path, body).unwrap();
}

/// Two clearly separated subjects, a few posts each.
pub fn newsgroup_posts() -> Vec<(&'static str, &'static str)> {
    vec![
        ("sci.space", "The rocket launch put the satellite into orbit around the planet"),
        ("sci.space", "Astronauts aboard the orbiting station watched the rocket launch"),
        ("sci.space", "Satellite telemetry confirmed a stable orbit after launch"),
        ("sci.space", "The planet probe used a rocket burn to change orbit"),
        ("rec.autos", "The engine needs new brakes and the tires are worn"),
        ("rec.autos", "Changing engine oil keeps the car engine healthy"),
        ("rec.autos", "Worn brakes and bald tires make the car unsafe"),
        ("rec.autos", "The mechanic replaced the car battery and engine belt"),
    ]
}

pub fn write_newsgroups(dir: &Path) {
    for (i, (group, body)) in newsgroup_posts().into_iter().enumerate() {
        let group_dir = dir.join(group);
        std::fs::create_dir_all(&group_dir).unwrap();
        std::fs::write(group_dir.join(format!("{i}")), body).unwrap();
    }
}

pub fn small_doc2vec_params() -> Doc2VecParams {
    Doc2VecParams {
        vector_size: 12,
        window: 2,
        min_count: 1,
        epochs: 5,
        sample: 0.0,
        ..Doc2VecParams::default()
    }
}

pub fn embeddings() -> Doc2Vec {
    let docs: Vec<TaggedDocument> = newsgroup_posts()
        .iter()
        .enumerate()
        .map(|(i, (_, body))| TaggedDocument {
            words: normalize(body),
            tag: i.to_string(),
        })
        .collect();
    Doc2Vec::train(&docs, small_doc2vec_params()).unwrap()
}

pub fn topic_model(num_topics: usize) -> TopicModel {
    let texts: Vec<Vec<String>> = newsgroup_posts().iter().map(|(_, b)| normalize(b)).collect();
    let dictionary = Dictionary::from_documents(&texts);
    let bows: Vec<_> = texts.iter().map(|t| dictionary.doc2bow(t)).collect();
    let model = LdaModel::train(&bows, dictionary.len(), num_topics, 5).unwrap();
    TopicModel { model, dictionary }
}
