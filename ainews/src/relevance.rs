// Keyword relevance predicate shared by every collector

/// Lowercase keywords; a candidate is in-domain when any of them occurs
/// anywhere in its text. Plain substring match, no tokenization.
pub const KEYWORDS: &[&str] = &[
    // concepts
    "ai",
    "artificial intelligence",
    "machine learning",
    "deep learning",
    "neural",
    "generative",
    "llm",
    "language model",
    "agent",
    // models and organizations
    "gpt",
    "chatgpt",
    "openai",
    "anthropic",
    "claude",
    "deepmind",
    "gemini",
    "llama",
    "mistral",
    "deepseek",
    "qwen",
    "hugging face",
    // techniques
    "transformer",
    "diffusion",
    "fine-tun",
    "retrieval-augmented",
    "reinforcement learning",
    "embedding",
    // Chinese
    "人工智能",
    "机器学习",
    "深度学习",
    "神经网络",
    "大模型",
    "大语言模型",
    "生成式",
    "智能体",
    "扩散模型",
    "强化学习",
];

/// True when `title + " " + content` contains any keyword, ignoring case.
pub fn is_relevant(title: &str, content: &str) -> bool {
    let text = format!("{} {}", title, content).to_lowercase();
    KEYWORDS.iter().any(|k| text.contains(k))
}
