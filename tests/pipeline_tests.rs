use mockall::mock;
use mockall::predicate::eq;

use ragline::{
    Document, HashEmbedder, LanguageModel, PromptTemplate, RagError, RagPipeline, TextChunker,
};

mock! {
    pub Llm {}
    impl LanguageModel for Llm {
        fn generate(&self, prompt: &str) -> ragline::Result<String>;
    }
}

const LLAMA: &str = "Llama is a language model released in 2023.";

fn pipeline_with(llm: MockLlm, top_k: usize) -> RagPipeline {
    RagPipeline::new(
        Box::new(HashEmbedder::new(128)),
        Box::new(llm),
        PromptTemplate::default(),
        top_k,
    )
}

#[test]
fn single_document_is_retrieved_as_context() {
    let expected_prompt = PromptTemplate::default().render(LLAMA, "What is Llama?");

    let mut llm = MockLlm::new();
    llm.expect_generate()
        .with(eq(expected_prompt))
        .times(1)
        .returning(|_| Ok("Llama is a language model.".to_string()));

    let mut pipeline = pipeline_with(llm, 4);
    let chunker = TextChunker::new(500, 50).unwrap();
    let added = pipeline
        .index_documents(&[Document::new("llama.txt", LLAMA)], &chunker)
        .unwrap();
    assert_eq!(added, 1);

    let answer = pipeline.ask_with_sources("What is Llama?").unwrap();
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].chunk.text, LLAMA);
    assert_eq!(answer.sources[0].chunk.metadata.file_name, "llama.txt");
    assert_eq!(answer.text, "Llama is a language model.");
}

#[test]
fn empty_index_still_calls_the_model() {
    let mut llm = MockLlm::new();
    llm.expect_generate()
        .withf(|prompt| prompt.contains("Context: \n") && prompt.contains("Question: Anyone there?"))
        .times(1)
        .returning(|_| Ok("I don't know".to_string()));

    let mut pipeline = pipeline_with(llm, 4);
    let chunker = TextChunker::new(500, 50).unwrap();
    assert_eq!(pipeline.index_documents(&[], &chunker).unwrap(), 0);
    assert!(pipeline.index().is_empty());

    assert!(pipeline.retrieve("Anyone there?").unwrap().is_empty());
    assert_eq!(pipeline.ask("Anyone there?").unwrap(), "I don't know");
}

#[test]
fn answer_is_returned_verbatim() {
    let raw = "  **Llama** is a model.\n\nSources: none\n";
    let mut llm = MockLlm::new();
    llm.expect_generate().returning(move |_| Ok(raw.to_string()));

    let mut pipeline = pipeline_with(llm, 2);
    let chunker = TextChunker::new(500, 50).unwrap();
    pipeline
        .index_documents(&[Document::new("llama.txt", LLAMA)], &chunker)
        .unwrap();

    assert_eq!(pipeline.ask("What is Llama?").unwrap(), raw);
}

#[test]
fn retrieval_is_capped_at_top_k() {
    let mut llm = MockLlm::new();
    llm.expect_generate().returning(|_| Ok(String::new()));

    let mut pipeline = pipeline_with(llm, 2);
    let chunker = TextChunker::new(20, 5).unwrap();
    let docs = [
        Document::new("a.txt", "Llamas live in the Andes mountains of South America."),
        Document::new("b.txt", "Rust guarantees memory safety without garbage collection."),
    ];
    let added = pipeline.index_documents(&docs, &chunker).unwrap();
    assert!(added > 2);

    let results = pipeline.retrieve("Where do llamas live?").unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].similarity >= results[1].similarity);

    let answer = pipeline.ask_with_sources("Where do llamas live?").unwrap();
    assert_eq!(answer.sources.len(), 2);
}

#[test]
fn context_chunks_are_joined_with_blank_lines() {
    let mut llm = MockLlm::new();
    llm.expect_generate()
        .withf(|prompt| {
            prompt.contains("Context: alpha beta\n\nalpha gamma\n")
                || prompt.contains("Context: alpha gamma\n\nalpha beta\n")
        })
        .times(1)
        .returning(|_| Ok("ok".to_string()));

    let mut pipeline = pipeline_with(llm, 2);
    let chunker = TextChunker::new(100, 10).unwrap();
    pipeline
        .index_documents(
            &[
                Document::new("1.txt", "alpha beta"),
                Document::new("2.txt", "alpha gamma"),
            ],
            &chunker,
        )
        .unwrap();

    assert_eq!(pipeline.ask("alpha").unwrap(), "ok");
}

#[test]
fn generation_errors_propagate() {
    let mut llm = MockLlm::new();
    llm.expect_generate()
        .returning(|_| Err(RagError::Generation("model offline".into())));

    let pipeline = pipeline_with(llm, 4);
    match pipeline.ask("What is Llama?") {
        Err(RagError::Generation(msg)) => assert_eq!(msg, "model offline"),
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}
