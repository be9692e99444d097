//! Built-in prompt bank. Guarantees the app is useful without a remote store
//! and serves as the fallback whenever the remote catalog is empty or down.

use crate::domain::{Grade, Prompt, Section};

fn p(id: &str, grade: Grade, section: Section, title: &str, text: &str, instructions: &str) -> Prompt {
  Prompt {
    id: id.into(),
    title: title.into(),
    text: text.into(),
    instructions: instructions.into(),
    grade,
    section,
    background_image: None,
    example_image: None,
  }
}

pub fn seed_prompts() -> Vec<Prompt> {
  use Grade::*;
  use Section::*;
  vec![
    // Grade 6 · Humanity
    p("6h1", Sixth, Humanity, "A Helping Hand",
      "Describe a time when someone helped you without being asked.",
      "Write at least two paragraphs. Explain how it made you feel."),
    p("6h2", Sixth, Humanity, "My Neighborhood",
      "Imagine you are giving a tour of your neighborhood to a new student.",
      "Describe three places and why they matter to you."),
    p("6h3", Sixth, Humanity, "The Best Day",
      "Tell the story of the best day you can remember.",
      "Use details for sight, sound and smell."),
    p("6h4", Sixth, Humanity, "A Letter to Future Me",
      "Write a letter to yourself to open in five years.",
      "Include one hope, one worry and one piece of advice."),
    p("6h5", Sixth, Humanity, "Small Kindness",
      "What is a small act of kindness that could change someone's day?",
      "Give an example and explain why it works."),
    p("6h6", Sixth, Humanity, "Family Tradition",
      "Describe a tradition your family or friends share.",
      "Explain where it came from and what it means."),
    p("6h7", Sixth, Humanity, "If Animals Could Talk",
      "Pick an animal you know well. What would it say to you?",
      "Write it as a short conversation."),
    // Grade 6 · Honors
    p("6ho1", Sixth, Honors, "The Inventor",
      "Invent a machine that solves a problem at your school.",
      "Explain how it works and what could go wrong."),
    p("6ho2", Sixth, Honors, "Opposite Day",
      "Write a story where everything happens in reverse.",
      "Keep the story understandable to the reader."),
    p("6ho3", Sixth, Honors, "Map of a Memory",
      "Draw a map in words of a place you remember from early childhood.",
      "Use directions and landmarks."),
    // Grade 7 · Humanity
    p("7h1", Seventh, Humanity, "Standing Up",
      "Write about a time you or someone you know stood up for what was right.",
      "Describe the situation, the choice, and the result."),
    p("7h2", Seventh, Humanity, "A Day Without Screens",
      "Imagine a full day with no phones, tablets or computers.",
      "Describe what you would do hour by hour."),
    p("7h3", Seventh, Humanity, "Hero Next Door",
      "Who is an everyday hero in your community?",
      "Use specific examples of what they do."),
    // Grade 7 · Honors
    p("7ho1", Seventh, Honors, "Two Roads",
      "Write about a choice where both options seemed right.",
      "Argue for the option you picked and address the other side."),
    p("7ho2", Seventh, Honors, "The Last Library",
      "In the future, only one library remains. Describe it.",
      "Build the world first, then tell one visitor's story."),
    p("7ho3", Seventh, Honors, "Rules to Change",
      "Choose one rule you would change at school.",
      "Write a persuasive essay with three reasons."),
    // Grade 8 · Humanity
    p("8h1", Eighth, Humanity, "Where I'm From",
      "Write a poem or essay that begins with the words \"I am from\".",
      "Include people, places and sayings that shaped you."),
    p("8h2", Eighth, Humanity, "Learning From Failure",
      "Describe something you failed at and what it taught you.",
      "Reflect on how you would approach it today."),
    p("8h3", Eighth, Humanity, "Community Voices",
      "Interview someone older than you about how your town has changed.",
      "Write it up as a short news feature."),
    // Grade 8 · Honors
    p("8ho1", Eighth, Honors, "The Unreliable Narrator",
      "Tell a story from the point of view of someone who is not telling the whole truth.",
      "Leave clues so the reader can figure it out."),
    p("8ho2", Eighth, Honors, "Ethics of AI",
      "Should a computer be allowed to grade student essays?",
      "Take a position and support it with evidence and a counterargument."),
    p("8ho3", Eighth, Honors, "Time Capsule",
      "Choose five objects that explain this year to someone in 2100.",
      "Justify each choice in a short paragraph."),
  ]
}
