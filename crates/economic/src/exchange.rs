//! A fixed-rate swap contract.
//!
//! Pools reach it only through executed proposal transactions; afterwards
//! the acquired token is registered with `add_token`.

use coffer_common::{AccountId, Amount, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::calls;
use crate::contract::{CallContext, Contract};

pub const SWAP: &str = "swap";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapArgs {
    pub amount_in: Amount,
}

/// Sells `quote` from its own reserve for `base` at `numerator / denominator`
#[derive(Debug, Clone)]
pub struct FixedRateExchange {
    pub base: AccountId,
    pub quote: AccountId,
    numerator: Amount,
    denominator: Amount,
}

impl FixedRateExchange {
    pub fn new(base: AccountId, quote: AccountId, numerator: Amount, denominator: Amount) -> Result<Self> {
        if denominator == 0 {
            return Err(Error::validation("Exchange rate denominator must be positive"));
        }
        Ok(Self {
            base,
            quote,
            numerator,
            denominator,
        })
    }

    pub fn quote_out(&self, amount_in: Amount) -> Result<Amount> {
        amount_in
            .checked_mul(self.numerator)
            .map(|p| p / self.denominator)
            .ok_or_else(|| Error::economic("Swap amount overflow"))
    }
}

impl Contract for FixedRateExchange {
    fn call(&mut self, ctx: CallContext<'_>, selector: &str, params: &[u8]) -> Result<Vec<u8>> {
        match selector {
            SWAP => {
                let args: SwapArgs = calls::decode(params)?;
                let amount_out = self.quote_out(args.amount_in)?;
                if amount_out == 0 {
                    return Err(Error::economic("Swap output is zero"));
                }
                ctx.assets
                    .transfer_token_from(&self.base, &ctx.this, &ctx.caller, &ctx.this, args.amount_in)?;
                ctx.assets
                    .transfer_token(&self.quote, &ctx.this, &ctx.caller, amount_out)?;
                info!("Swapped {} for {} on behalf of {}", args.amount_in, amount_out, ctx.caller);
                calls::encode(&amount_out)
            }
            other => Err(Error::validation(format!("Unknown exchange selector: {}", other))),
        }
    }

    fn clone_box(&self) -> Box<dyn Contract> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetBook;
    use coffer_common::ErrorKind;

    #[test]
    fn test_swap_pulls_base_and_pays_quote() {
        let mut assets = AssetBook::new();
        let usdc = assets.create_token("USDC").unwrap();
        let wbtc = assets.create_token("WBTC").unwrap();
        let dex = AccountId::derive("dex");
        let pool = AccountId::derive("pool");
        assets.mint_token(&usdc, &pool, 100).unwrap();
        assets.mint_token(&wbtc, &dex, 1_000).unwrap();
        assets.approve(&usdc, &pool, &dex, 10).unwrap();

        let mut exchange = FixedRateExchange::new(usdc, wbtc, 3, 2).unwrap();
        let ctx = CallContext {
            caller: pool,
            this: dex,
            value: 0,
            now: 0,
            assets: &mut assets,
        };
        let out = exchange
            .call(ctx, SWAP, &calls::encode(&SwapArgs { amount_in: 10 }).unwrap())
            .unwrap();
        assert_eq!(calls::decode::<Amount>(&out).unwrap(), 15);
        assert_eq!(assets.token_balance(&wbtc, &pool).unwrap(), 15);
        assert_eq!(assets.token_balance(&usdc, &dex).unwrap(), 10);

        let ctx = CallContext {
            caller: pool,
            this: dex,
            value: 0,
            now: 0,
            assets: &mut assets,
        };
        let err = exchange
            .call(ctx, SWAP, &calls::encode(&SwapArgs { amount_in: 10 }).unwrap())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Economic);
    }
}
