//! The reference presentation.
//!
//! A fixed deck built by direct builder calls. It shows the shape of deck the
//! pipeline is expected to produce and is never invoked by the web flow.

use crate::deck::{CodeBlock, ContentSlide, Deck, Frame};
use crate::Rgb;

const AGENT_SNIPPET: &str = r#"
from langchain.llms import OpenAI
from langchain.agents import initialize_agent, Tool
from langchain.agents import AgentType

# 1. Define your LLM
llm = OpenAI(temperature=0)

# 2. Define your tools
tools = [
    Tool(
        name="Search",
        func=lambda query: "Search results for " + query, # Placeholder for actual search
        description="useful for when you need to answer questions about current events or facts"
    )
]

# 3. Initialize the agent
agent = initialize_agent(tools, llm, agent=AgentType.ZERO_SHOT_REACT_DESCRIPTION, verbose=True)

# 4. Run the agent with a query
# agent.run("What is the capital of France and its current population?")
"#;

/// "Agentic AI with Langchain": five white slides.
pub fn agentic_ai_deck() -> Deck {
    Deck::new()
        .with_background(Rgb::WHITE)
        .title_slide("Agentic AI with Langchain", Some("A Simple Chatbot Example"))
        .content_slide(
            ContentSlide::new("Understanding Agentic AI")
                .bullet("Goal-Oriented: AI that breaks down complex tasks into sub-goals.")
                .bullet("Reasoning: Uses a Large Language Model (LLM) to decide what to do next.")
                .bullet("Tool Use: Can select and use external tools (e.g., search, calculator) to achieve goals.")
                .bullet("Iterative Process: Plans, acts, observes, and refines its approach."),
        )
        .content_slide(
            ContentSlide::new("Langchain's Role in Agentic AI")
                .bullet("Framework for developing applications powered by LLMs.")
                .bullet("Agents: Core component enabling LLMs to interact with their environment.")
                .bullet("Key Components: LLM (the brain), Tools (the actions), Agent Executor (orchestration).")
                .bullet("Simplifies dynamic decision-making and tool selection for complex tasks."),
        )
        .content_slide(
            ContentSlide::new("Agentic Chatbot in Action")
                .bullet("Goal: Answer user questions, even if requiring external knowledge.")
                .bullet("Tools Used:")
                .sub_bullet("- LLM (e.g., OpenAI GPT-3.5) for reasoning.")
                .sub_bullet("- Search Tool (e.g., Google Search API) for external data.")
                .bullet("Example Process:")
                .sub_bullet("1. User asks: 'What is the population of Tokyo?'")
                .sub_bullet("2. Agent reasons: 'I need a search tool to find this information.'")
                .sub_bullet("3. Agent uses Search Tool: Queries 'population of Tokyo'.")
                .sub_bullet("4. Agent synthesizes: Provides the answer based on search results."),
        )
        .content_slide(
            ContentSlide::new("Building an Agent (Conceptual)")
                .bullet("Conceptual Langchain Code Snippet:")
                .bullet("Agentic AI empowers LLMs to go beyond simple text generation.")
                .bullet("Langchain simplifies the creation of such intelligent systems.")
                .with_code(
                    CodeBlock::new(AGENT_SNIPPET)
                        .with_font("Consolas")
                        .with_frame(Frame::inches(1.0, 2.5, 8.0, 3.0)),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Slide;
    use crate::pptx::render_pptx;

    #[test]
    fn test_reference_deck_shape() {
        let deck = agentic_ai_deck();
        assert_eq!(deck.len(), 5);
        assert!(deck.check(5).is_valid());
        assert!(matches!(deck.slides[0], Slide::Title(_)));

        match &deck.slides[3] {
            Slide::Content(s) => assert_eq!(s.bullets.iter().filter(|b| b.level == 1).count(), 6),
            other => panic!("unexpected slide: {:?}", other),
        }
        match &deck.slides[4] {
            Slide::Content(s) => {
                let code = s.code.as_ref().unwrap();
                assert!(code.text.contains("initialize_agent"));
                assert_eq!(code.font, "Consolas");
            }
            other => panic!("unexpected slide: {:?}", other),
        }
    }

    #[test]
    fn test_reference_deck_renders() {
        let bytes = render_pptx(&agentic_ai_deck()).unwrap();
        // Zip local file header magic.
        assert_eq!(&bytes[..4], b"PK\x03\x04");
    }
}
