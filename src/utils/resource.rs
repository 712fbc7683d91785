// src/utils/resource.rs

use serde::Serialize;

/// Status of an asynchronous result as seen by a client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resource<T> {
    Loading,
    Success { data: T },
    /// Failed. `data` carries whatever partial value is still useful.
    Error { message: String, data: Option<T> },
}

impl<T> Resource<T> {
    pub fn success(data: T) -> Self {
        Resource::Success { data }
    }

    pub fn error(message: impl Into<String>, data: Option<T>) -> Self {
        Resource::Error {
            message: message.into(),
            data,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Resource::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Resource::Loading => None,
            Resource::Success { data } => Some(data),
            Resource::Error { data, .. } => data.as_ref(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resource<U> {
        match self {
            Resource::Loading => Resource::Loading,
            Resource::Success { data } => Resource::Success { data: f(data) },
            Resource::Error { message, data } => Resource::Error {
                message,
                data: data.map(f),
            },
        }
    }

    pub fn on_success(&self, action: impl FnOnce(&T)) -> &Self {
        if let Resource::Success { data } = self {
            action(data);
        }
        self
    }

    pub fn on_error(&self, action: impl FnOnce(&str)) -> &Self {
        if let Resource::Error { message, .. } = self {
            action(message);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_keeps_partial_data_on_error() {
        let res: Resource<i32> = Resource::error("write failed", Some(2));
        let mapped = res.map(|n| n * 10);
        assert_eq!(mapped.data(), Some(&20));
    }

    #[test]
    fn test_callbacks_fire_on_matching_variant() {
        let mut seen = None;
        Resource::success(5).on_success(|n| seen = Some(*n)).on_error(|_| panic!("not an error"));
        assert_eq!(seen, Some(5));

        let loading: Resource<i32> = Resource::Loading;
        assert!(loading.is_loading());
        assert_eq!(loading.data(), None);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(Resource::success(1)).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"], 1);
    }
}
