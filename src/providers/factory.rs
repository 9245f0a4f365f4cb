use crate::config::Provider;
use crate::providers::{
    LLMProvider, anthropic::AnthropicProvider, openai_compatible::OpenAICompatibleProvider,
};
use std::collections::HashMap;

type ProviderCreator = Box<dyn Fn() -> Box<dyn LLMProvider> + Send + Sync>;

/// Maps a configured `Provider` to the wire strategy that talks to it.
pub struct ProviderFactory {
    creators: HashMap<Provider, ProviderCreator>,
}

impl ProviderFactory {
    pub fn new() -> Self {
        let mut creators: HashMap<Provider, ProviderCreator> = HashMap::new();

        creators.insert(
            Provider::Mistral,
            Box::new(|| {
                Box::new(OpenAICompatibleProvider::new(Provider::Mistral)) as Box<dyn LLMProvider>
            }),
        );
        creators.insert(
            Provider::OpenAI,
            Box::new(|| {
                Box::new(OpenAICompatibleProvider::new(Provider::OpenAI)) as Box<dyn LLMProvider>
            }),
        );
        creators.insert(
            Provider::Anthropic,
            Box::new(|| Box::new(AnthropicProvider::new()) as Box<dyn LLMProvider>),
        );

        Self { creators }
    }

    pub fn create(&self, provider: Provider) -> Option<Box<dyn LLMProvider>> {
        self.creators.get(&provider).map(|creator| creator())
    }
}

impl Default for ProviderFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_provider_has_a_strategy() {
        let factory = ProviderFactory::new();
        for provider in Provider::ALL {
            let strategy = factory.create(provider).expect("strategy registered");
            assert_eq!(strategy.name(), provider);
        }
    }
}
