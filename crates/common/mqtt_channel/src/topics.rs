use crate::errors::MqttError;

/// An MQTT topic
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Topic {
    pub name: String,
}

impl Topic {
    /// Check if the topic name is valid and build a new topic.
    pub fn new(name: &str) -> Result<Topic, MqttError> {
        let name = String::from(name);
        if rumqttc::valid_topic(&name) {
            Ok(Topic { name })
        } else {
            Err(MqttError::InvalidTopic { name })
        }
    }

    /// Build a new topic, assuming the name is valid
    pub fn new_unchecked(name: &str) -> Topic {
        Topic {
            name: String::from(name),
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.name
    }
}

/// An MQTT topic filter
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct TopicFilter {
    patterns: Vec<String>,
}

impl TopicFilter {
    /// Check if the pattern is valid and build a new topic filter.
    pub fn new(pattern: &str) -> Result<TopicFilter, MqttError> {
        let mut filter = TopicFilter::empty();
        filter.add(pattern)?;
        Ok(filter)
    }

    /// An empty topic filter
    pub fn empty() -> TopicFilter {
        TopicFilter { patterns: vec![] }
    }

    /// Check if the pattern is valid and add it to this topic filter.
    pub fn add(&mut self, pattern: &str) -> Result<(), MqttError> {
        if is_valid_filter(pattern) {
            self.patterns.push(pattern.to_string());
            Ok(())
        } else {
            Err(MqttError::InvalidFilter {
                pattern: pattern.to_string(),
            })
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// Check that a pattern is a non-empty valid MQTT topic filter
pub fn is_valid_filter(pattern: &str) -> bool {
    !pattern.is_empty() && rumqttc::valid_filter(pattern)
}
