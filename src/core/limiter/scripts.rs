//! Atomic Redis scripts
//!
//! Every admission decision is a single server-side script over one key:
//! the client never reads-then-writes outside a script, which is what keeps
//! concurrent replicas from overshooting a limit. Limit scripts share a
//! preamble: if the stored `config_hash` differs from the supplied one the
//! key is deleted and the request is treated as first touch under the new
//! configuration. Every write refreshes a finite TTL so abandoned keys are
//! garbage-collected by the store.
//!
//! All scripts return `{allowed, remaining, retry_after_ms}`; the
//! reputation script returns `{score, violation_count, good_requests, ttl}`
//! with the score serialized as a string (an integer reply would truncate
//! the float).

use once_cell::sync::Lazy;
use redis::Script;

const TOKEN_BUCKET_SRC: &str = r#"
local key = KEYS[1]
local config_hash = ARGV[1]
local capacity = tonumber(ARGV[2])
local refill_rate = tonumber(ARGV[3])
local refill_period = tonumber(ARGV[4])
local now = tonumber(ARGV[5])

-- Reset state if the configuration changed
local stored_config = redis.call('HGET', key, 'config_hash')
if stored_config and stored_config ~= config_hash then
    redis.call('DEL', key)
end

local bucket = redis.call('HMGET', key, 'tokens', 'last_refill')
local tokens = tonumber(bucket[1])
local last_refill = tonumber(bucket[2])

-- First touch: a full bucket
if tokens == nil then
    tokens = capacity
    last_refill = now
end

-- Refill whole elapsed periods; the remainder stays banked in last_refill
local periods = math.floor((now - last_refill) / refill_period)
if periods > 0 then
    tokens = math.min(capacity, tokens + periods * refill_rate)
    last_refill = last_refill + periods * refill_period
end

local ttl_seconds = math.ceil((math.ceil(capacity / refill_rate) * refill_period) / 1000) + 60

if tokens >= 1 then
    tokens = tokens - 1
    redis.call('HMSET', key, 'tokens', tokens, 'last_refill', last_refill, 'config_hash', config_hash)
    redis.call('EXPIRE', key, ttl_seconds)
    return {1, tokens, 0}
end

redis.call('HMSET', key, 'tokens', tokens, 'last_refill', last_refill, 'config_hash', config_hash)
redis.call('EXPIRE', key, ttl_seconds)
return {0, 0, math.max(0, last_refill + refill_period - now)}
"#;

const LEAKY_BUCKET_SRC: &str = r#"
local key = KEYS[1]
local config_hash = ARGV[1]
local capacity = tonumber(ARGV[2])
local leak_rate = tonumber(ARGV[3])
local leak_period = tonumber(ARGV[4])
local now = tonumber(ARGV[5])

-- Reset state if the configuration changed
local stored_config = redis.call('HGET', key, 'config_hash')
if stored_config and stored_config ~= config_hash then
    redis.call('DEL', key)
end

local bucket = redis.call('HMGET', key, 'level', 'last_leak')
local level = tonumber(bucket[1])
local last_leak = tonumber(bucket[2])

-- First touch: an empty bucket
if level == nil then
    level = 0
    last_leak = now
end

-- Drain whole elapsed periods
local periods = math.floor((now - last_leak) / leak_period)
if periods > 0 then
    level = math.max(0, level - periods * leak_rate)
    last_leak = last_leak + periods * leak_period
end

local ttl_seconds = math.ceil((math.ceil(capacity / leak_rate) * leak_period) / 1000) + 60

if level < capacity then
    level = level + 1
    redis.call('HMSET', key, 'level', level, 'last_leak', last_leak, 'config_hash', config_hash)
    redis.call('EXPIRE', key, ttl_seconds)
    return {1, capacity - level, 0}
end

redis.call('HMSET', key, 'level', level, 'last_leak', last_leak, 'config_hash', config_hash)
redis.call('EXPIRE', key, ttl_seconds)
return {0, 0, math.max(0, last_leak + leak_period - now)}
"#;

const FIXED_WINDOW_SRC: &str = r#"
local key = KEYS[1]
local config_hash = ARGV[1]
local limit = tonumber(ARGV[2])
local window_size = tonumber(ARGV[3])
local now = tonumber(ARGV[4])

-- Reset state if the configuration changed
local stored_config = redis.call('HGET', key, 'config_hash')
if stored_config and stored_config ~= config_hash then
    redis.call('DEL', key)
end

local bucket = redis.call('HMGET', key, 'count', 'window_start')
local count = tonumber(bucket[1]) or 0
local window_start = tonumber(bucket[2]) or 0

-- Roll over into the current window
local current_window = math.floor(now / window_size) * window_size
if window_start < current_window then
    count = 0
    window_start = current_window
end

local ttl_seconds = math.ceil(window_size / 1000) + 60

if count < limit then
    count = count + 1
    redis.call('HMSET', key, 'count', count, 'window_start', window_start, 'config_hash', config_hash)
    redis.call('EXPIRE', key, ttl_seconds)
    return {1, limit - count, 0}
end

redis.call('HMSET', key, 'count', count, 'window_start', window_start, 'config_hash', config_hash)
redis.call('EXPIRE', key, ttl_seconds)
return {0, 0, math.max(0, window_start + window_size - now)}
"#;

const SLIDING_WINDOW_SRC: &str = r#"
local key = KEYS[1]
local config_hash = ARGV[1]
local limit = tonumber(ARGV[2])
local window_size = tonumber(ARGV[3])
local now = tonumber(ARGV[4])

-- Reset state if the configuration changed
local stored_config = redis.call('HGET', key, 'config_hash')
if stored_config and stored_config ~= config_hash then
    redis.call('DEL', key)
end

-- One hash field per 1-second bucket; sum the live ones and prune the rest
local window_start = now - window_size
local fields = redis.call('HGETALL', key)
local total = 0
local oldest = nil
for i = 1, #fields, 2 do
    local field = fields[i]
    if field ~= 'config_hash' then
        local bucket_start = tonumber(field)
        if bucket_start == nil or bucket_start < window_start then
            redis.call('HDEL', key, field)
        else
            total = total + (tonumber(fields[i + 1]) or 0)
            if oldest == nil or bucket_start < oldest then
                oldest = bucket_start
            end
        end
    end
end

local ttl_seconds = math.ceil(window_size / 1000) + 60

if total < limit then
    local bucket_start = math.floor(now / 1000) * 1000
    redis.call('HINCRBY', key, bucket_start, 1)
    redis.call('HSET', key, 'config_hash', config_hash)
    redis.call('EXPIRE', key, ttl_seconds)
    return {1, limit - (total + 1), 0}
end

redis.call('HSET', key, 'config_hash', config_hash)
redis.call('EXPIRE', key, ttl_seconds)
return {0, 0, math.max(0, oldest + window_size - now)}
"#;

const REPUTATION_UPDATE_SRC: &str = r#"
local reputation_key = KEYS[1]
local is_violation = tonumber(ARGV[1])
local now = tonumber(ARGV[2])

local rep_data = redis.call('HMGET', reputation_key, 'score', 'violation_count', 'good_requests', 'last_activity')
local current_score = tonumber(rep_data[1]) or 1.0
local violation_count = tonumber(rep_data[2]) or 0
local good_requests = tonumber(rep_data[3]) or 0
local last_activity = tonumber(rep_data[4]) or now

-- Natural decay for callers with a clean slate that went quiet for a while
local time_since_last = now - last_activity
if violation_count == 0 and current_score < 1.0 and time_since_last > 600000 then
    local time_recovery = math.min(0.05, (time_since_last / 3600000) * 0.1)
    current_score = math.min(1.0, current_score + time_recovery)
end

if is_violation == 1 then
    violation_count = violation_count + 1

    -- Progressive punishment, escalating for repeat offenders
    local base_impact = math.max(0.05, math.min(0.15, 1.0 / (good_requests + 1)))
    local escalation_factor = 1.0
    if violation_count >= 10 then
        escalation_factor = 2.0
    elseif violation_count >= 5 then
        escalation_factor = 1.5
    end
    current_score = math.max(0.0, current_score - base_impact * escalation_factor)

    -- Rapid-fire violations within one second read as bot behavior
    local last_violation = tonumber(redis.call('HGET', reputation_key, 'last_violation') or 0)
    if last_violation > 0 and (now - last_violation) < 1000 then
        current_score = math.max(0.0, current_score - 0.2)
    end

    redis.call('HMSET', reputation_key,
        'score', current_score,
        'violation_count', violation_count,
        'good_requests', good_requests,
        'last_violation', now,
        'last_activity', now)
else
    good_requests = good_requests + 1

    if violation_count > 0 then
        -- Slow recovery for violators, slower the more they violated
        local recovery_rate = 0.005 * (1.0 - math.min(0.8, violation_count * 0.1))
        local improvement = math.min(0.02, recovery_rate / math.sqrt(violation_count))
        current_score = math.min(1.0, current_score + improvement)
    elseif current_score < 1.0 then
        current_score = math.min(1.0, current_score + 0.02)
    end

    redis.call('HMSET', reputation_key,
        'score', current_score,
        'violation_count', violation_count,
        'good_requests', good_requests,
        'last_activity', now)
end

-- Low scores are monitored longer; persistent violators doubly so
local ttl
if current_score < 0.1 then
    ttl = 14400
elseif current_score < 0.3 then
    ttl = 7200
elseif current_score < 0.7 then
    ttl = 3600
else
    ttl = 1800
end
if violation_count >= 10 then
    ttl = ttl * 2
end

redis.call('EXPIRE', reputation_key, ttl)

return {
    tostring(math.floor(current_score * 1000) / 1000),
    violation_count,
    good_requests,
    ttl
}
"#;

pub static TOKEN_BUCKET: Lazy<Script> = Lazy::new(|| Script::new(TOKEN_BUCKET_SRC));
pub static LEAKY_BUCKET: Lazy<Script> = Lazy::new(|| Script::new(LEAKY_BUCKET_SRC));
pub static FIXED_WINDOW: Lazy<Script> = Lazy::new(|| Script::new(FIXED_WINDOW_SRC));
pub static SLIDING_WINDOW: Lazy<Script> = Lazy::new(|| Script::new(SLIDING_WINDOW_SRC));
pub static REPUTATION_UPDATE: Lazy<Script> = Lazy::new(|| Script::new(REPUTATION_UPDATE_SRC));
