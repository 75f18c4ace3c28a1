/*!
# Declaration extraction tests

Client library declarations split over a client file and a types file, the
way the exchange SDKs ship them.
*/

use exchange_docs::dts::{extract_methods, ExtractOptions, KeyStyle};
use exchange_docs::offline_data::{PropertyShape, TypeShape};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const TYPES: &str = r#"
export type CategoryV5 = 'spot' | 'linear' | 'inverse' | 'option';
export interface CategorySymbolParams {
    category: CategoryV5;
    symbol?: string;
}
export interface GetKlineParamsV5 extends CategorySymbolParams {
    interval: KlineIntervalV3;
    start?: number;
    end?: number;
    limit?: number;
}
export type KlineIntervalV3 = '1' | '3' | '5';
export interface APIResponseV3<T> {
    retCode: number;
    retMsg: string;
    result: T;
}
export declare enum OrderSideV5 {
    Buy = "Buy",
    Sell = "Sell"
}
export interface OrderParamsV5 {
    category: CategoryV5;
    symbol: string;
    side: OrderSideV5;
    qty: string;
}
export interface OrderResultV5 {
    orderId: string;
    orderLinkId: string;
}
"#;

const CLIENT: &str = r#"
import { BaseRestClient } from './util/BaseRestClient';
import { APIResponseV3, GetKlineParamsV5, OrderParamsV5, OrderResultV5 } from './types';
/**
 * REST client for the v5 API
 */
export declare class RestClientV5 extends BaseRestClient {
    private readonly options;
    constructor(restClientOptions?: RestClientOptions);
    getClientType(): string;
    /**
     * Query the kline data.
     *
     * @param params - kline request
     * @returns list of klines
     */
    getKline(params: GetKlineParamsV5): Promise<APIResponseV3<string[][]>>;
    /**
     * Create an order.
     * @param params order parameters
     */
    submitOrder(params: OrderParamsV5): Promise<APIResponseV3<OrderResultV5>>;
    getServerTime(): Promise<number>;
    fetchTimeOffset(): Promise<number>;
    _getSignature(data: string): string;
    static version(): string;
}
"#;

struct Sdk {
    _dir: TempDir,
    root: PathBuf,
    client: PathBuf,
}

fn sdk() -> Sdk {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("lib");
    fs::create_dir_all(root.join("types")).unwrap();
    fs::write(root.join("types").join("v5.d.ts"), TYPES).unwrap();
    let client = root.join("rest-client-v5.d.ts");
    fs::write(&client, CLIENT).unwrap();
    Sdk {
        _dir: dir,
        root,
        client,
    }
}

fn other(text: &str) -> TypeShape {
    TypeShape::other(text)
}

fn property(name: &str, type_shape: TypeShape, optional: bool) -> PropertyShape {
    PropertyShape {
        name: name.to_string(),
        type_shape,
        optional,
    }
}

#[test]
fn test_method_selection() {
    let sdk = sdk();

    let methods = extract_methods(&[sdk.client.clone()], &[sdk.root.clone()], &ExtractOptions::default());
    let keys: Vec<_> = methods.keys().cloned().collect();
    assert_eq!(
        keys,
        vec!["fetchTimeOffset", "getClientType", "getKline", "getServerTime", "submitOrder"]
    );

    let options = ExtractOptions {
        promise_only: true,
        key_style: KeyStyle::FileStem,
        ..Default::default()
    };
    let methods = extract_methods(&[sdk.client.clone()], &[sdk.root.clone()], &options);
    let keys: Vec<_> = methods.keys().cloned().collect();
    assert_eq!(
        keys,
        vec![
            "rest-client-v5.fetchTimeOffset",
            "rest-client-v5.getKline",
            "rest-client-v5.getServerTime",
            "rest-client-v5.submitOrder"
        ]
    );
}

#[test]
fn test_params_resolved_through_type_roots() {
    let sdk = sdk();
    let methods = extract_methods(&[sdk.client.clone()], &[sdk.root.clone()], &ExtractOptions::default());

    let kline = &methods["getKline"];
    assert_eq!(kline.class_name, "RestClientV5");
    assert_eq!(kline.method_comment, "Query the kline data.");
    assert_eq!(kline.return_comment, "list of klines");
    assert_eq!(kline.params.len(), 1);
    assert_eq!(kline.params[0].comment, "kline request");

    let category = TypeShape::Union {
        types: vec![other("'spot'"), other("'linear'"), other("'inverse'"), other("'option'")],
    };
    assert_eq!(
        kline.params[0].type_shape,
        TypeShape::Object {
            name: "GetKlineParamsV5".to_string(),
            properties: vec![
                property(
                    "interval",
                    TypeShape::Union {
                        types: vec![other("'1'"), other("'3'"), other("'5'")]
                    },
                    false
                ),
                property("start", TypeShape::Number, true),
                property("end", TypeShape::Number, true),
                property("limit", TypeShape::Number, true),
                property("category", category.clone(), false),
                property("symbol", TypeShape::String, true),
            ],
        }
    );

    let order = &methods["submitOrder"];
    assert_eq!(order.params[0].comment, "order parameters");
    let TypeShape::Object { properties, .. } = &order.params[0].type_shape else {
        panic!("expected object params");
    };
    assert_eq!(properties[0].type_shape, category);
    assert_eq!(
        properties[2].type_shape,
        TypeShape::Union {
            types: vec![other("OrderSideV5.Buy"), other("OrderSideV5.Sell")]
        }
    );

    assert_eq!(
        order.return_type,
        TypeShape::Generic {
            name: "Promise".to_string(),
            type_arguments: vec![TypeShape::Generic {
                name: "APIResponseV3".to_string(),
                type_arguments: vec![TypeShape::Object {
                    name: "OrderResultV5".to_string(),
                    properties: vec![
                        property("orderId", TypeShape::String, false),
                        property("orderLinkId", TypeShape::String, false),
                    ],
                }],
            }],
        }
    );
}

#[test]
fn test_method_info_json_shape() {
    let sdk = sdk();
    let methods = extract_methods(&[sdk.client.clone()], &[sdk.root.clone()], &ExtractOptions::default());

    assert_eq!(
        serde_json::to_value(&methods["getServerTime"]).unwrap(),
        json!({
            "className": "RestClientV5",
            "methodName": "getServerTime",
            "methodComment": "",
            "params": [],
            "returnType": {
                "kind": "generic",
                "name": "Promise",
                "typeArguments": [{"kind": "number"}]
            },
            "returnComment": ""
        })
    );
}

#[test]
fn test_unresolved_types_without_type_roots() {
    let sdk = sdk();

    let methods = exchange_docs::extract_declarations(&sdk.client).unwrap();
    assert_eq!(methods["getKline"].params[0].type_shape, other("GetKlineParamsV5"));

    let missing = exchange_docs::extract_declarations(sdk.root.join("missing.d.ts"));
    assert!(missing.is_err());
}
