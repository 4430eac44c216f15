use crate::error::AlphaEarthError;

use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

pub(crate) type NoQuery = [(&'static str, String)];

impl crate::AlphaEarth {
    // Public HTTP method wrappers, using the default request timeout.
    pub async fn get<R: DeserializeOwned + Send + 'static>(
        &self,
        endpoint: &str,
    ) -> Result<R, AlphaEarthError> {
        self._request(Method::GET, endpoint, None::<&Value>, None::<&NoQuery>, None)
            .await
    }

    pub async fn get_with_query<Q, R>(&self, endpoint: &str, query: &Q) -> Result<R, AlphaEarthError>
    where
        Q: Serialize + Send + Sync + ?Sized,
        R: DeserializeOwned + Send + 'static,
    {
        self._request(Method::GET, endpoint, None::<&Value>, Some(query), None)
            .await
    }

    pub async fn post<T, R>(&self, endpoint: &str, data: &T) -> Result<R, AlphaEarthError>
    where
        T: Serialize + Send + Sync + ?Sized,
        R: DeserializeOwned + Send + 'static,
    {
        self._request(Method::POST, endpoint, Some(data), None::<&NoQuery>, None)
            .await
    }
}
